//! Per-log cells and the registry that owns them.
//!
//! Every named log gets exactly one cell guarding its in-memory view.
//! Appends, cache fills, and waiter handling for a log all run under its
//! cell lock; the registry itself is only locked long enough to hand out
//! a cell.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;

use super::waiters::Waiters;

/// In-memory view of one log.
///
/// `age` always reflects committed facts when observed through the lock:
/// the append path reserves a slot by incrementing it, but rolls back
/// before releasing the lock if the store write fails.
pub struct LogCell {
    /// Whether recorded facts have been replayed into `age` and `state`.
    pub loaded: bool,
    /// Count of durably recorded facts.
    pub age: u64,
    /// Folded state, absent until the log is loaded or a state exists.
    pub state: Option<Value>,
    /// Readers parked for the next fact.
    pub waiters: Waiters,
}

impl LogCell {
    fn new() -> Self {
        Self {
            loaded: false,
            age: 0,
            state: None,
            waiters: Waiters::new(),
        }
    }
}

/// One log's name and cell, shared by reference.
pub struct LogHandle {
    pub name: String,
    pub cell: Mutex<LogCell>,
}

/// All known logs, created on first touch.
pub struct LogRegistry {
    logs: RwLock<HashMap<String, Arc<LogHandle>>>,
}

impl LogRegistry {
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the handle for `name`, creating its cell on first touch.
    pub fn get_or_create(&self, name: &str) -> Arc<LogHandle> {
        {
            let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = logs.get(name) {
                return Arc::clone(handle);
            }
        }
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        let handle = logs.entry(name.to_string()).or_insert_with(|| {
            Arc::new(LogHandle {
                name: name.to_string(),
                cell: Mutex::new(LogCell::new()),
            })
        });
        Arc::clone(handle)
    }

    /// Number of logs touched so far.
    pub fn len(&self) -> usize {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_start_unloaded_and_empty() {
        let registry = LogRegistry::new();
        let handle = registry.get_or_create("demo");
        let cell = handle.cell.blocking_lock();
        assert!(!cell.loaded);
        assert_eq!(cell.age, 0);
        assert!(cell.state.is_none());
        assert!(cell.waiters.is_empty());
    }

    #[test]
    fn same_name_yields_same_cell() {
        let registry = LogRegistry::new();
        let first = registry.get_or_create("demo");
        let second = registry.get_or_create("demo");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_names_get_distinct_cells() {
        let registry = LogRegistry::new();
        let a = registry.get_or_create("a");
        let b = registry.get_or_create("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }
}
