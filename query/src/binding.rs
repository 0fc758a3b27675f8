use serde::Serialize;
use serde_json::Value;

use crate::Error;

/// Arguments for a query, or the sentinel to skip it entirely.
///
/// A skipped query registers no subscription and reports the pending state.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArgs<A> {
    /// Run the query with these arguments.
    Some(A),
    /// Do not run the query.
    Skip,
}

impl<A> From<Option<A>> for QueryArgs<A> {
    fn from(args: Option<A>) -> Self {
        match args {
            Some(args) => QueryArgs::Some(args),
            None => QueryArgs::Skip,
        }
    }
}

/// Stable identity of a binding: the canonical serialization of `[path, args]`.
///
/// Two bindings are equal iff their keys are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(String);

impl BindingKey {
    /// Derives the key for a function path and its encoded arguments.
    pub fn new(path: &str, args: &Value) -> Self {
        let mut out = String::from("[");
        out.push_str(&Value::from(path).to_string());
        out.push(',');
        write_canonical(args, &mut out);
        out.push(']');
        BindingKey(out)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BindingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A query function together with its encoded arguments.
///
/// Equality and hashing only consider the [`BindingKey`].
#[derive(Debug, Clone)]
pub struct QueryRequest {
    path: &'static str,
    args: Value,
    key: BindingKey,
}

impl QueryRequest {
    /// Encodes `args` and derives the binding key.
    pub fn new<A: Serialize>(path: &'static str, args: &A) -> Result<Self, Error> {
        let args = serde_json::to_value(args).map_err(Error::encode)?;
        let key = BindingKey::new(path, &args);
        Ok(Self { path, args, key })
    }

    /// The function path.
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The encoded arguments.
    pub fn args(&self) -> &Value {
        &self.args
    }

    /// The binding key.
    pub fn key(&self) -> &BindingKey {
        &self.key
    }
}

impl PartialEq for QueryRequest {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueryRequest {}

impl std::hash::Hash for QueryRequest {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Serializes a JSON value deterministically.
///
/// Object keys are sorted at every depth and no whitespace is emitted, so the
/// output does not depend on field insertion order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
