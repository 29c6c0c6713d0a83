use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use template_model::{Binding, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("argument '{0}' must be of the form key=value")]
    MalformedPair(String),
    #[error("duplicate key '{0}' passed via --var")]
    DuplicateKey(String),
    #[error("file argument '{0}' for key '{1}' can't be found: {2}")]
    FileNotFound(String, String, std::io::Error),
    #[error("value for key '{0}' is not valid JSON: {1}")]
    MalformedJson(String, String),
}

/// Parses one `--var KEY=VALUE` argument. `VALUE` starting with `[` is
/// read as a JSON array; starting with `file:` reads the named file's
/// contents as the value; anything else is a literal string.
pub fn parse_kv(raw: &str) -> Result<(String, Value), KvError> {
    let (key, val) = raw.split_once('=').ok_or_else(|| KvError::MalformedPair(raw.to_string()))?;
    let key = key.to_string();

    let value = if let Some(stripped) = val.strip_prefix("file:") {
        let contents = fs::read_to_string(Path::new(stripped))
            .map_err(|e| KvError::FileNotFound(stripped.to_string(), key.clone(), e))?;
        Value::Str(contents)
    } else if val.starts_with('[') {
        let items: Vec<serde_json::Value> =
            serde_json::from_str(val).map_err(|e| KvError::MalformedJson(key.clone(), e.to_string()))?;
        Value::Array(items.into_iter().map(json_scalar_to_value).collect())
    } else {
        Value::Str(val.to_string())
    };

    Ok((key, value))
}

fn json_scalar_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int).unwrap_or_else(|| Value::Str(n.to_string())),
        other => Value::Str(other.to_string()),
    }
}

/// Collects a repeated `--var` flag's raw `key=value` strings into a
/// Binding, rejecting a key passed more than once.
pub fn collect_vars(raw: &[String]) -> Result<Binding, KvError> {
    let mut out: Binding = IndexMap::new();
    for entry in raw {
        let (key, value) = parse_kv(entry)?;
        if out.contains_key(&key) {
            return Err(KvError::DuplicateKey(key));
        }
        out.insert(key, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_value() {
        let (k, v) = parse_kv("project=my-proj").unwrap();
        assert_eq!(k, "project");
        assert_eq!(v, Value::Str("my-proj".into()));
    }

    #[test]
    fn json_array_value() {
        let (_, v) = parse_kv("tables=[\"a\",\"b\"]").unwrap();
        match v {
            Value::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn file_value_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.txt");
        std::fs::write(&path, "hello from disk").unwrap();
        let raw = format!("greeting=file:{}", path.display());
        let (_, v) = parse_kv(&raw).unwrap();
        assert_eq!(v, Value::Str("hello from disk".into()));
    }

    #[test]
    fn missing_equals_is_malformed() {
        let err = parse_kv("justakey").unwrap_err();
        assert!(matches!(err, KvError::MalformedPair(_)));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = collect_vars(&["a=1".to_string(), "a=2".to_string()]).unwrap_err();
        assert!(matches!(err, KvError::DuplicateKey(_)));
    }
}
