//! Fact and snapshot types.
//!
//! A fact is an immutable plain-text statement recorded in a log. Facts
//! are numbered starting at 1, in the order they were recorded, and never
//! change once durable.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single recorded fact: the raw text body exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fact(String);

impl Fact {
    /// Create a fact from its text body.
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    /// The fact body as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the fact, yielding its body.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fact {
    fn from(body: &str) -> Self {
        Self(body.to_string())
    }
}

impl From<String> for Fact {
    fn from(body: String) -> Self {
        Self(body)
    }
}

/// Point-in-time view of a log: its durable fact count and folded state.
///
/// `age` counts recorded facts. `state` is the fold of facts 1 through
/// `age` under the log's integration rule; a log with no facts reports an
/// empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub age: u64,
    pub state: Value,
}

impl Snapshot {
    pub fn new(age: u64, state: Value) -> Self {
        Self { age, state }
    }

    /// The view of a log with no facts.
    pub fn empty() -> Self {
        Self {
            age: 0,
            state: empty_state(),
        }
    }
}

/// The state a fold starts from: an empty JSON object.
pub(crate) fn empty_state() -> Value {
    Value::Object(Map::new())
}
