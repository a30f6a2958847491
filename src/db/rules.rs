//! # Integration Rules
//!
//! A rule decides which facts a log accepts and how each accepted fact
//! folds into the log's state. Rules are pure: the same state and fact
//! always produce the same successor state, so replay and replication
//! reach the state the writer reached.
//!
//! Rule ids carry a version (`counter/v1`). Changing what a rule does
//! means shipping it under a new id; an existing log keeps the behavior
//! it was recorded under.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use super::errors::{DbError, DbResult};
use super::fact::Fact;

/// One fold step from a state to its successor.
///
/// Validation and integration are a single step: a fact is either folded
/// or rejected, never accepted without a successor state.
pub trait IntegrationRule: Send + Sync {
    /// Stable versioned identifier, e.g. `counter/v1`.
    fn id(&self) -> &str;

    /// Fold `fact` into `state`, returning the successor state, or reject
    /// the fact with [`DbError::Integration`]. Must not observe anything
    /// beyond its arguments.
    fn integrate(&self, state: &Value, fact: &Fact) -> DbResult<Value>;
}

/// Counts occurrences of a fixed set of tokens.
///
/// A fact is accepted only when its entire body is one of the configured
/// tokens. The state keeps one counter per token seen so far.
#[derive(Debug, Clone)]
pub struct CounterRule {
    tokens: BTreeSet<String>,
}

impl CounterRule {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl IntegrationRule for CounterRule {
    fn id(&self) -> &str {
        "counter/v1"
    }

    fn integrate(&self, state: &Value, fact: &Fact) -> DbResult<Value> {
        if !self.tokens.contains(fact.as_str()) {
            return Err(DbError::Integration(format!(
                "unrecognized fact: {fact}"
            )));
        }
        let mut next = state.clone();
        match next.as_object_mut() {
            Some(counters) => {
                let count = counters
                    .get(fact.as_str())
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                counters.insert(fact.as_str().to_string(), Value::from(count + 1));
            }
            None => {
                return Err(DbError::Integration(
                    "state is not an object".to_string(),
                ));
            }
        }
        Ok(next)
    }
}

/// Maps log names to the rule that governs them.
///
/// Logs without an explicit binding use the default rule. Bindings are
/// fixed at construction time; a log's rule never changes while serving.
pub struct RuleRegistry {
    default_rule: Arc<dyn IntegrationRule>,
    bindings: HashMap<String, Arc<dyn IntegrationRule>>,
}

impl RuleRegistry {
    pub fn new(default_rule: Arc<dyn IntegrationRule>) -> Self {
        Self {
            default_rule,
            bindings: HashMap::new(),
        }
    }

    /// Bind `log` to `rule`, replacing any earlier binding.
    pub fn bind(&mut self, log: impl Into<String>, rule: Arc<dyn IntegrationRule>) {
        self.bindings.insert(log.into(), rule);
    }

    /// The rule governing `log`.
    pub fn rule_for(&self, log: &str) -> Arc<dyn IntegrationRule> {
        match self.bindings.get(log) {
            Some(rule) => Arc::clone(rule),
            None => Arc::clone(&self.default_rule),
        }
    }
}
