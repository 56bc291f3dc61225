//! Structured values for content matching
//!
//! Record payloads and structured filter expressions are both parsed into
//! `Value`, a small tagged tree. Matching never looks at keys or nesting:
//! a value is reduced to the set of its scalar leaves and filter tokens are
//! tested for membership in that set.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display, Formatter};

/// A leaf of a structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// A parsed structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Scalar {
    /// Text form used for membership tests.
    ///
    /// Strings are compared unquoted, so the token `5` typed in a comma
    /// list matches both the number `5` and the string `"5"`. Numbers are
    /// compared by value: `5`, `5.0` and `5e0` share one form.
    pub fn canonical(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => number_text(n),
            Scalar::Text(s) => s.clone(),
        }
    }
}

// Largest magnitude below which every integral f64 is exact
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl Value {
    /// Strictly parse JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(text).map(Value::from)
    }

    /// Collect every scalar leaf, depth first. Keys and shape are discarded.
    pub fn flatten(&self) -> Vec<&Scalar> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Scalar>) {
        match self {
            Value::Scalar(scalar) => out.push(scalar),
            Value::List(items) => {
                for item in items {
                    item.collect_leaves(out);
                }
            }
            Value::Map(entries) => {
                for value in entries.values() {
                    value.collect_leaves(out);
                }
            }
        }
    }

    /// The flattened leaves as a set for membership tests.
    pub fn leaf_set(&self) -> LeafSet {
        LeafSet {
            leaves: self.flatten().into_iter().map(Scalar::canonical).collect(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Value::Scalar(Scalar::Number(n)),
            serde_json::Value::String(s) => Value::Scalar(Scalar::Text(s)),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Unordered set of flattened leaves.
#[derive(Debug, Clone, Default)]
pub struct LeafSet {
    leaves: HashSet<String>,
}

impl LeafSet {
    #[inline]
    pub fn contains(&self, scalar: &Scalar) -> bool {
        match scalar {
            // Bare tokens that spell a number also match it by value
            Scalar::Text(s) => {
                self.leaves.contains(s.as_str())
                    || s.parse::<serde_json::Number>()
                        .is_ok_and(|n| self.leaves.contains(&number_text(&n)))
            }
            other => self.leaves.contains(&other.canonical()),
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
