//! Fixed evaluation environment
//!
//! The environment is handed to the oracle for both compilation and
//! evaluation. The generator itself only ever reads the set of top-level
//! names, never the values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value bound in the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer scalar
    Int(i64),
    /// Float scalar
    Float(f64),
    /// Boolean scalar
    Bool(bool),
    /// String scalar
    Str(String),
    /// Callable value
    Func {
        /// Name the checker uses to pick the implementation
        func: String,
        /// Number of parameters (ignored when variadic)
        arity: usize,
        /// Accepts any number of arguments
        variadic: bool,
    },
    /// Ordered collection
    Array(Vec<Value>),
    /// Nested mapping
    Map(BTreeMap<String, Value>),
}

impl Value {
    fn func(name: &str, arity: usize) -> Self {
        Self::Func {
            func: name.to_string(),
            arity,
            variadic: false,
        }
    }

    fn variadic(name: &str) -> Self {
        Self::Func {
            func: name.to_string(),
            arity: 0,
            variadic: true,
        }
    }

    fn map<const N: usize>(entries: [(&str, Value); N]) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Whether this value can be called
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Func { .. })
    }
}

/// Mapping from identifier names to values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
}

impl Default for Environment {
    fn default() -> Self {
        let inner = Value::map([
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            (
                "obj",
                Value::map([("a", Value::Int(1)), ("b", Value::Int(2))]),
            ),
        ]);

        let obj = Value::map([
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            ("obj", inner),
            ("fn", Value::func("fn", 1)),
            ("head", Value::variadic("head")),
        ]);

        let bindings = [
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            ("f", Value::Float(0.5)),
            ("ok", Value::Bool(true)),
            ("s", Value::Str("abc".to_string())),
            (
                "arr",
                Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ),
            ("obj", obj),
            ("add", Value::func("add", 2)),
            ("div", Value::func("div", 2)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self { bindings }
    }
}

impl Environment {
    /// Create an environment from explicit bindings
    #[must_use]
    pub fn from_bindings(bindings: BTreeMap<String, Value>) -> Self {
        Self { bindings }
    }

    /// Top-level identifier names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    /// Look up a top-level name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Resolve a member path such as `["obj", "obj", "a"]`
    #[must_use]
    pub fn lookup_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.get(first)?, |value, key| match value {
            Value::Map(entries) => entries.get(*key),
            _ => None,
        })
    }

    /// Number of top-level bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the environment has no bindings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// JSON form sent to external checkers
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
