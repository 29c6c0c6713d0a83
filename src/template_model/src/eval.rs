use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::value::{Binding, ResolvedBinding, Value};

const DASH2USCORE_SUFFIX: &str = "_dash2uscore";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unmapped template reference '{reference}' in key '{key}'")]
    Unmapped { key: String, reference: String },
    #[error("circular template reference: {}", .cycle.join(" -> "))]
    Circular { cycle: Vec<String> },
    #[error("cannot resolve non-scalar value for key '{0}' before exploding the template")]
    NonScalarInput(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Ref(String),
}

/// Splits a template string into literal runs and `{name}` references,
/// collapsing `{{`/`}}` escapes into literal `{`/`}` as it goes.
fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '{' => {
                if let Some(end) = chars[i + 1..].iter().position(|&c| c == '}') {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    let name: String = chars[i + 1..i + 1 + end].iter().collect();
                    tokens.push(Token::Ref(name));
                    i = i + 1 + end + 1;
                } else {
                    literal.push('{');
                    i += 1;
                }
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn referenced_names(s: &str) -> IndexSet<String> {
    tokenize(s)
        .into_iter()
        .filter_map(|t| match t {
            Token::Ref(name) => Some(name),
            Token::Literal(_) => None,
        })
        .collect()
}

/// Recursively resolves every `{name}` placeholder in a Binding's string
/// values against the other values in the same Binding.
///
/// Preconditions: `binding` must already be fully exploded — every value
/// is a scalar. Non-scalar input is a programmer error, reported as
/// [`TemplateError::NonScalarInput`].
pub fn eval_tmpl_recurse(binding: &Binding) -> Result<ResolvedBinding, TemplateError> {
    for (k, v) in binding {
        if !v.is_scalar() {
            return Err(TemplateError::NonScalarInput(k.clone()));
        }
    }

    let mut done: IndexMap<String, Value> = IndexMap::new();
    let mut pending: IndexMap<String, String> = IndexMap::new();

    for (k, v) in binding {
        match v {
            Value::Str(s) => {
                if referenced_names(s).is_empty() {
                    let rendered = render_literal(s);
                    let value = if k.ends_with(DASH2USCORE_SUFFIX) {
                        Value::Str(rendered.replace('-', "_"))
                    } else {
                        Value::Str(rendered)
                    };
                    done.insert(k.clone(), value);
                } else {
                    pending.insert(k.clone(), s.clone());
                }
            }
            other => {
                done.insert(k.clone(), other.clone());
            }
        }
    }

    loop {
        let mut progress = false;
        let keys: Vec<String> = pending.keys().cloned().collect();
        for k in keys {
            let template = pending.get(&k).unwrap().clone();
            let refs = referenced_names(&template);
            if refs.iter().all(|r| done.contains_key(r)) {
                let rendered = substitute(&template, &done);
                let value = if k.ends_with(DASH2USCORE_SUFFIX) {
                    Value::Str(rendered.replace('-', "_"))
                } else {
                    Value::Str(rendered)
                };
                pending.shift_remove(&k);
                done.insert(k, value);
                progress = true;
            }
        }
        if !progress {
            break;
        }
    }

    if pending.is_empty() {
        return Ok(done);
    }

    // Anything still pending is either unmapped or part of a cycle.
    for (k, template) in &pending {
        for r in referenced_names(template) {
            if !pending.contains_key(&r) && !done.contains_key(&r) {
                tracing::debug!(key = %k, reference = %r, "unmapped template reference");
                return Err(TemplateError::Unmapped {
                    key: k.clone(),
                    reference: r,
                });
            }
        }
    }

    let cycle = find_cycle(&pending).unwrap_or_else(|| pending.keys().cloned().collect());
    tracing::debug!(cycle = ?cycle, "circular template reference");
    Err(TemplateError::Circular { cycle })
}

fn render_literal(s: &str) -> String {
    tokenize(s)
        .into_iter()
        .map(|t| match t {
            Token::Literal(l) => l,
            Token::Ref(r) => format!("{{{r}}}"),
        })
        .collect()
}

fn substitute(s: &str, done: &IndexMap<String, Value>) -> String {
    tokenize(s)
        .into_iter()
        .map(|t| match t {
            Token::Literal(l) => l,
            Token::Ref(r) => done
                .get(&r)
                .map(|v| v.display_string())
                .unwrap_or_default(),
        })
        .collect()
}

/// Finds one cycle among the still-pending (mutually referential) keys
/// via the same "strip zero-out-degree nodes" sweep used by the
/// dependency graph's cycle detector.
fn find_cycle(pending: &IndexMap<String, String>) -> Option<Vec<String>> {
    let mut remaining: IndexMap<String, IndexSet<String>> = pending
        .iter()
        .map(|(k, v)| {
            let refs: IndexSet<String> = referenced_names(v)
                .into_iter()
                .filter(|r| pending.contains_key(r))
                .collect();
            (k.clone(), refs)
        })
        .collect();

    loop {
        let resolvable: Vec<String> = remaining
            .iter()
            .filter(|(_, refs)| refs.is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        if resolvable.is_empty() {
            break;
        }
        for k in &resolvable {
            remaining.shift_remove(k);
        }
        for refs in remaining.values_mut() {
            for k in &resolvable {
                refs.shift_remove(k);
            }
        }
    }

    if remaining.is_empty() {
        None
    } else {
        Some(remaining.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, &str)]) -> Binding {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Str(v.to_string())))
            .collect()
    }

    #[test]
    fn resolves_simple_reference() {
        let b = binding(&[("name", "world"), ("greeting", "hello {name}")]);
        let r = eval_tmpl_recurse(&b).unwrap();
        assert_eq!(r["greeting"], Value::Str("hello world".into()));
    }

    #[test]
    fn collapses_escaped_braces() {
        let b = binding(&[("literal", "{{not_a_ref}}")]);
        let r = eval_tmpl_recurse(&b).unwrap();
        assert_eq!(r["literal"], Value::Str("{not_a_ref}".into()));
    }

    #[test]
    fn dash2uscore_transforms_value_not_key() {
        let b = binding(&[("raw", "a-b-c"), ("key_dash2uscore", "{raw}")]);
        let r = eval_tmpl_recurse(&b).unwrap();
        assert_eq!(r["key_dash2uscore"], Value::Str("a_b_c".into()));
    }

    #[test]
    fn dash2uscore_applies_even_without_a_placeholder() {
        let b = binding(&[("b_dash2uscore", "c-a")]);
        let r = eval_tmpl_recurse(&b).unwrap();
        assert_eq!(r["b_dash2uscore"], Value::Str("c_a".into()));
    }

    #[test]
    fn unmapped_reference_is_fatal() {
        let b = binding(&[("greeting", "hello {missing}")]);
        let err = eval_tmpl_recurse(&b).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Unmapped {
                key: "greeting".into(),
                reference: "missing".into()
            }
        );
    }

    #[test]
    fn circular_reference_is_fatal() {
        let b = binding(&[("a", "{b}"), ("b", "{a}")]);
        let err = eval_tmpl_recurse(&b).unwrap_err();
        match err {
            TemplateError::Circular { cycle } => {
                assert_eq!(cycle.len(), 2);
            }
            other => panic!("expected Circular, got {other:?}"),
        }
    }
}
