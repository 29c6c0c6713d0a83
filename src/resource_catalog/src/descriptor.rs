use std::path::Path;

use indexmap::IndexMap;
use template_model::{Binding, Value};

use crate::error::CatalogError;

/// Parses one descriptor file's text into the list of raw Bindings it
/// declares. A top-level mapping is one Binding; a top-level sequence is
/// one Binding per element. YAML and JSON share this path — YAML is a
/// superset of JSON's data model, so deserializing either into
/// `serde_json::Value` first and converting from there handles both
/// without a second conversion path.
pub fn parse_descriptor(text: &str, source: &Path) -> Result<Vec<Binding>, CatalogError> {
    let raw: serde_json::Value = serde_yaml::from_str(text)
        .map_err(|e| CatalogError::Parse(source.display().to_string(), e.to_string()))?;

    match raw {
        serde_json::Value::Object(map) => Ok(vec![object_to_binding(map, source)?]),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::Object(map) => object_to_binding(map, source),
                other => Err(CatalogError::Parse(
                    source.display().to_string(),
                    format!("expected an object in the descriptor list, found {other}"),
                )),
            })
            .collect(),
        other => Err(CatalogError::Parse(
            source.display().to_string(),
            format!("descriptor must be a mapping or a list of mappings, found {other}"),
        )),
    }
}

fn object_to_binding(
    map: serde_json::Map<String, serde_json::Value>,
    source: &Path,
) -> Result<Binding, CatalogError> {
    let mut binding: Binding = IndexMap::new();
    for (k, v) in map {
        binding.insert(k.clone(), json_to_value(&k, v, source)?);
    }
    Ok(binding)
}

fn json_to_value(key: &str, v: serde_json::Value, source: &Path) -> Result<Value, CatalogError> {
    match v {
        serde_json::Value::Null => Ok(Value::Str(String::new())),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => Ok(Value::Str(n.to_string())),
        },
        serde_json::Value::String(s) => Ok(Value::Str(s)),
        serde_json::Value::Array(items) => {
            if items.iter().all(|i| i.is_object()) && !items.is_empty() {
                let subs = items
                    .into_iter()
                    .map(|i| match i {
                        serde_json::Value::Object(map) => object_to_binding(map, source),
                        _ => unreachable!("checked above"),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Objects(subs))
            } else {
                let scalars = items
                    .into_iter()
                    .map(|i| json_to_value(key, i, source))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(scalars))
            }
        }
        serde_json::Value::Object(_) => Err(CatalogError::Parse(
            source.display().to_string(),
            format!("key '{key}' is a bare object; only arrays of objects are supported as values"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn p() -> PathBuf {
        PathBuf::from("test.view")
    }

    #[test]
    fn parses_single_mapping() {
        let text = "dataset: ds\ntable: t\nquery: select 1\n";
        let out = parse_descriptor(text, &p()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["dataset"], Value::Str("ds".into()));
    }

    #[test]
    fn parses_list_of_mappings() {
        let text = "- dataset: ds\n  table: a\n- dataset: ds\n  table: b\n";
        let out = parse_descriptor(text, &p()).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn array_of_objects_becomes_objects_value() {
        let text = "dataset: ds\nsources:\n  - name: a\n  - name: b\n";
        let out = parse_descriptor(text, &p()).unwrap();
        match &out[0]["sources"] {
            Value::Objects(subs) => assert_eq!(subs.len(), 2),
            other => panic!("expected Objects, got {other:?}"),
        }
    }

    #[test]
    fn json_descriptor_parses_through_the_same_path() {
        let text = r#"{"dataset": "ds", "keywords_table": ["a", "b"]}"#;
        let out = parse_descriptor(text, &p()).unwrap();
        match &out[0]["keywords_table"] {
            Value::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected Array, got {other:?}"),
        }
    }
}
