use indexmap::IndexMap;

/// A template variable binding: string keys to dynamically-shaped values.
///
/// Mirrors the descriptor-file shape directly — a raw binding may still
/// carry arrays and arrays of sub-bindings. [`crate::explode::explode`]
/// is what reduces a `Binding` down to one where every value is a
/// [`Value::Str`], [`Value::Int`] or [`Value::Bool`].
pub type Binding = IndexMap<String, Value>;

/// A `Binding` in which every value has been reduced to a simple scalar
/// and every `{name}` placeholder substituted. Produced by
/// [`crate::eval::eval_tmpl_recurse`].
pub type ResolvedBinding = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    /// An array of scalar values — multiplies the Cartesian product.
    Array(Vec<Value>),
    /// An array of sub-binding objects, each merged wholesale into the
    /// parent on explosion.
    Objects(Vec<Binding>),
}

impl Value {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Int(_) | Value::Bool(_))
    }

    /// Render a scalar as it would appear interpolated into a template
    /// string. Panics on non-scalars — callers resolve those first.
    pub fn display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Objects(_) => {
                unreachable!("display_string called on a non-scalar Value")
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
