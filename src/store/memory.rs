//! In-memory fact store
//!
//! Facts vanish with the process. Used for tests and for serving
//! throwaway logs without touching disk.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::errors::{StoreError, StoreResult};
use super::FactStore;
use crate::db::fact::Fact;

/// Volatile store backed by one `Vec<Fact>` per log.
pub struct MemoryStore {
    logs: Mutex<HashMap<String, Vec<Fact>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Fact>>> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn length(&self, log: &str) -> StoreResult<u64> {
        Ok(self.lock().get(log).map_or(0, |facts| facts.len() as u64))
    }

    async fn append(&self, log: &str, fact: &Fact) -> StoreResult<u64> {
        let mut logs = self.lock();
        let facts = logs.entry(log.to_string()).or_default();
        facts.push(fact.clone());
        Ok(facts.len() as u64)
    }

    async fn read_at(&self, log: &str, index: u64) -> StoreResult<Fact> {
        let logs = self.lock();
        logs.get(log)
            .and_then(|facts| {
                index
                    .checked_sub(1)
                    .and_then(|slot| facts.get(slot as usize))
            })
            .cloned()
            .ok_or(StoreError::MissingIndex {
                log: log.to_string(),
                index,
            })
    }

    async fn read_range(&self, log: &str, from: u64) -> StoreResult<Vec<Fact>> {
        let logs = self.lock();
        let facts = match logs.get(log) {
            Some(facts) => facts,
            None => return Ok(Vec::new()),
        };
        let skip = from.saturating_sub(1) as usize;
        Ok(facts.iter().skip(skip).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_return_consecutive_positions() {
        let store = MemoryStore::new();
        assert_eq!(store.append("demo", &Fact::new("a")).await.unwrap(), 1);
        assert_eq!(store.append("demo", &Fact::new("b")).await.unwrap(), 2);
        assert_eq!(store.length("demo").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn logs_are_independent() {
        let store = MemoryStore::new();
        store.append("a", &Fact::new("one")).await.unwrap();
        assert_eq!(store.length("a").await.unwrap(), 1);
        assert_eq!(store.length("b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_at_is_one_based() {
        let store = MemoryStore::new();
        store.append("demo", &Fact::new("first")).await.unwrap();
        store.append("demo", &Fact::new("second")).await.unwrap();

        assert_eq!(store.read_at("demo", 1).await.unwrap().as_str(), "first");
        assert_eq!(store.read_at("demo", 2).await.unwrap().as_str(), "second");
    }

    #[tokio::test]
    async fn read_at_misses_are_reported() {
        let store = MemoryStore::new();
        store.append("demo", &Fact::new("only")).await.unwrap();

        for index in [0, 2, 99] {
            let err = store.read_at("demo", index).await.unwrap_err();
            assert!(matches!(err, StoreError::MissingIndex { .. }), "index {index}");
        }
    }

    #[tokio::test]
    async fn read_range_runs_to_the_end() {
        let store = MemoryStore::new();
        for body in ["a", "b", "c"] {
            store.append("demo", &Fact::new(body)).await.unwrap();
        }

        let tail = store.read_range("demo", 2).await.unwrap();
        assert_eq!(tail, vec![Fact::new("b"), Fact::new("c")]);

        assert!(store.read_range("demo", 4).await.unwrap().is_empty());
        assert!(store.read_range("missing", 1).await.unwrap().is_empty());
    }
}
