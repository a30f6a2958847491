//! Replay and fold of recorded facts into log state.
//!
//! A log's state is never stored; it is always the fold of its recorded
//! facts under the log's rule, recomputed by replay on first touch and
//! advanced one fact at a time afterwards.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::errors::{DbError, DbResult};
use super::fact::{empty_state, Fact};
use super::registry::LogCell;
use super::rules::RuleRegistry;
use crate::store::FactStore;

/// Rebuilds and advances the in-memory view of logs.
pub struct Projector {
    store: Arc<dyn FactStore>,
    rules: Arc<RuleRegistry>,
}

impl Projector {
    pub fn new(store: Arc<dyn FactStore>, rules: Arc<RuleRegistry>) -> Self {
        Self { store, rules }
    }

    /// Replay every recorded fact of `log` into `cell`. A no-op once the
    /// cell is loaded; the caller holds the cell lock, so the replay runs
    /// at most once per process however many requests race for it.
    pub async fn ensure_loaded(&self, log: &str, cell: &mut LogCell) -> DbResult<()> {
        if cell.loaded {
            return Ok(());
        }
        let facts = self.store.read_range(log, 1).await?;
        let rule = self.rules.rule_for(log);

        let mut state: Option<Value> = None;
        for (slot, fact) in facts.iter().enumerate() {
            let current = state.take().unwrap_or_else(empty_state);
            let next = rule.integrate(&current, fact).map_err(|e| DbError::LoadFailed {
                log: log.to_string(),
                reason: format!("fact {} rejected on replay: {e}", slot + 1),
            })?;
            state = Some(next);
        }

        cell.age = facts.len() as u64;
        cell.state = state;
        cell.loaded = true;
        debug!(log, age = cell.age, "log loaded");
        Ok(())
    }

    /// Validate `fact` against the log's rule by folding it, producing
    /// the successor state. Nothing is committed; the caller decides.
    pub fn prepare(&self, log: &str, cell: &LogCell, fact: &Fact) -> DbResult<Value> {
        let rule = self.rules.rule_for(log);
        let current = cell.state.clone().unwrap_or_else(empty_state);
        rule.integrate(&current, fact)
    }
}
