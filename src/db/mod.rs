//! # Fact Log Engine
//!
//! Named, append-only logs of plain-text facts. Each log folds its facts
//! into a state value through an integration rule; appends are optimistic
//! and serialized per log, and readers can park for the next fact.

pub mod coordinator;
pub mod errors;
pub mod fact;
pub mod projection;
pub mod registry;
pub mod rules;
pub mod service;
pub mod waiters;

pub use errors::{DbError, DbResult};
pub use fact::{Fact, Snapshot};
pub use rules::{CounterRule, IntegrationRule, RuleRegistry};
pub use service::{FactRead, Factlog};

/// True if `name` can serve as a log name: 1 to 128 characters drawn
/// from ASCII alphanumerics, `_`, `-` and `.`, not starting with a dot.
pub fn is_valid_log_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
}

pub(crate) fn validate_log_name(name: &str) -> DbResult<()> {
    if is_valid_log_name(name) {
        Ok(())
    } else {
        Err(DbError::Validation(format!("invalid db name {name:?}")))
    }
}
