//! # Fact Log Service
//!
//! The public face of the engine. Reads come in three shapes: the folded
//! snapshot, a range running to the end of the log, and a single fact
//! that may long-poll. Writes go through the append coordinator in
//! `coordinator.rs`; both halves share the per-log cells.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::errors::{DbError, DbResult};
use super::fact::{empty_state, Fact, Snapshot};
use super::projection::Projector;
use super::registry::LogRegistry;
use super::rules::RuleRegistry;
use super::validate_log_name;
use crate::store::FactStore;

/// Outcome of asking for a single fact.
#[derive(Debug)]
pub enum FactRead {
    /// The fact is durable and in hand.
    Ready(Fact),
    /// The fact is one past the end; the receiver resolves when a writer
    /// records it.
    Wait(oneshot::Receiver<Fact>),
}

/// A set of named fact logs over one store and one rule registry.
pub struct Factlog {
    pub(crate) store: Arc<dyn FactStore>,
    pub(crate) projector: Projector,
    pub(crate) registry: LogRegistry,
}

impl Factlog {
    pub fn new(store: Arc<dyn FactStore>, rules: Arc<RuleRegistry>) -> Self {
        Self {
            projector: Projector::new(Arc::clone(&store), rules),
            store,
            registry: LogRegistry::new(),
        }
    }

    /// Folded state and age of `log`. Loads the log on first touch.
    pub async fn snapshot(&self, log: &str) -> DbResult<Snapshot> {
        validate_log_name(log)?;
        let handle = self.registry.get_or_create(log);
        let mut cell = handle.cell.lock().await;
        self.projector.ensure_loaded(log, &mut cell).await?;
        Ok(Snapshot::new(
            cell.age,
            cell.state.clone().unwrap_or_else(empty_state),
        ))
    }

    /// Facts from 1-based `from` through the end of `log`, bounded by the
    /// age observed at dispatch.
    ///
    /// Kept quirk of the wire contract: `from` equal to the current age
    /// yields an empty list, not the final fact. Asking one past the end
    /// is also empty; further out is an error.
    pub async fn facts_since(&self, log: &str, from: u64) -> DbResult<Vec<Fact>> {
        validate_log_name(log)?;
        if from == 0 {
            return Err(DbError::Validation(
                "fact numbers start at 1".to_string(),
            ));
        }
        let handle = self.registry.get_or_create(log);
        let cell = handle.cell.lock().await;
        let age = self.age_of(log, &cell).await?;
        drop(cell);

        if from > age + 1 {
            return Err(DbError::NotFound(format!(
                "db {log} has no fact {from} yet"
            )));
        }
        if from >= age {
            return Ok(Vec::new());
        }
        let mut facts = self.store.read_range(log, from).await?;
        facts.truncate((age + 1 - from) as usize);
        Ok(facts)
    }

    /// One fact of `log` by 1-based number. Asking for the fact one past
    /// the end parks the caller until a writer records it; asking further
    /// out is an error.
    pub async fn fact_at(&self, log: &str, number: u64) -> DbResult<FactRead> {
        validate_log_name(log)?;
        if number == 0 {
            return Err(DbError::Validation(
                "fact numbers start at 1".to_string(),
            ));
        }
        let handle = self.registry.get_or_create(log);
        let mut cell = handle.cell.lock().await;
        let age = self.age_of(log, &cell).await?;

        if number <= age {
            drop(cell);
            let fact = self.store.read_at(log, number).await?;
            return Ok(FactRead::Ready(fact));
        }
        if number == age + 1 {
            return Ok(FactRead::Wait(cell.waiters.register()));
        }
        Err(DbError::NotFound(format!(
            "db {log} has no fact {number} yet"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::rules::CounterRule;
    use crate::store::MemoryStore;

    fn service() -> Factlog {
        let rules = Arc::new(RuleRegistry::new(Arc::new(CounterRule::new(["cool"]))));
        Factlog::new(Arc::new(MemoryStore::new()), rules)
    }

    async fn record(db: &Factlog, log: &str, count: u64) {
        for n in 1..=count {
            db.append(log, n, Fact::new("cool")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn snapshot_of_untouched_log_is_empty() {
        let db = service();
        let snapshot = db.snapshot("demo").await.unwrap();
        assert_eq!(snapshot, Snapshot::empty());
    }

    #[tokio::test]
    async fn snapshot_reflects_recorded_facts() {
        let db = service();
        record(&db, "demo", 3).await;

        let snapshot = db.snapshot("demo").await.unwrap();
        assert_eq!(snapshot.age, 3);
        assert_eq!(snapshot.state, serde_json::json!({"cool": 3}));
    }

    #[tokio::test]
    async fn bad_log_names_are_refused_up_front() {
        let db = service();
        let err = db.snapshot("no/slashes").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        let err = db.fact_at("..", 1).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn fact_numbers_start_at_one() {
        let db = service();
        let err = db.fact_at("demo", 0).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        let err = db.facts_since("demo", 0).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn fact_at_returns_recorded_facts() {
        let db = service();
        record(&db, "demo", 2).await;

        match db.fact_at("demo", 1).await.unwrap() {
            FactRead::Ready(fact) => assert_eq!(fact.as_str(), "cool"),
            FactRead::Wait(_) => panic!("fact 1 must be ready"),
        }
    }

    #[tokio::test]
    async fn fact_one_past_the_end_parks() {
        let db = service();
        record(&db, "demo", 1).await;

        let rx = match db.fact_at("demo", 2).await.unwrap() {
            FactRead::Wait(rx) => rx,
            FactRead::Ready(_) => panic!("fact 2 does not exist yet"),
        };

        db.append("demo", 2, Fact::new("cool")).await.unwrap();
        assert_eq!(rx.await.unwrap().as_str(), "cool");
    }

    #[tokio::test]
    async fn fact_past_the_frontier_is_not_found() {
        let db = service();
        record(&db, "demo", 1).await;

        let err = db.fact_at("demo", 3).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn facts_since_returns_the_tail() {
        let db = service();
        record(&db, "demo", 4).await;

        let tail = db.facts_since("demo", 2).await.unwrap();
        assert_eq!(tail.len(), 3);
    }

    #[tokio::test]
    async fn facts_since_the_current_age_is_empty() {
        let db = service();
        record(&db, "demo", 3).await;

        // Quirk of the wire contract: from == age yields nothing.
        assert!(db.facts_since("demo", 3).await.unwrap().is_empty());
        // One past the end is empty too; nothing has happened there yet.
        assert!(db.facts_since("demo", 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn facts_since_past_the_frontier_is_not_found() {
        let db = service();
        record(&db, "demo", 3).await;

        let err = db.facts_since("demo", 5).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn facts_since_on_empty_log() {
        let db = service();
        assert!(db.facts_since("demo", 1).await.unwrap().is_empty());
        assert!(db.facts_since("demo", 2).await.unwrap_err().status_code() == 404);
    }

    #[tokio::test]
    async fn reads_do_not_force_a_replay() {
        let db = service();
        record(&db, "demo", 2).await;

        // A fresh service over the same store: point and range reads go
        // to the store without loading the log.
        let db = Factlog::new(
            Arc::clone(&db.store),
            Arc::new(RuleRegistry::new(Arc::new(CounterRule::new(["cool"])))),
        );
        match db.fact_at("demo", 1).await.unwrap() {
            FactRead::Ready(fact) => assert_eq!(fact.as_str(), "cool"),
            FactRead::Wait(_) => panic!("fact 1 must be ready"),
        }
        let handle = db.registry.get_or_create("demo");
        assert!(!handle.cell.lock().await.loaded);
    }
}
