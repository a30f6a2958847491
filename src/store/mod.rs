//! # Durable Fact Stores
//!
//! A store holds the facts of every log in recorded order, addressed by
//! 1-based position. The engine serializes appends per log, so a store
//! never sees two concurrent appends to the same log; what a store must
//! guarantee is that an append is durable before it resolves, and that
//! `length` never counts a fact that is not. Reads run outside the
//! engine's serialization and may land mid-append, so a store must also
//! keep them from observing or disturbing an append in flight.

pub mod errors;
pub mod file;
pub mod memory;
pub mod record;

pub use errors::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::db::fact::Fact;

/// Durable, ordered storage for the facts of named logs.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Number of facts recorded for `log`; 0 for a log never written.
    async fn length(&self, log: &str) -> StoreResult<u64>;

    /// Record `fact` at the end of `log`, returning its 1-based position.
    /// The fact must be durable before this resolves.
    async fn append(&self, log: &str, fact: &Fact) -> StoreResult<u64>;

    /// Fetch the fact at 1-based `index`.
    async fn read_at(&self, log: &str, index: u64) -> StoreResult<Fact>;

    /// Fetch every fact from 1-based `from` through the end, oldest
    /// first. Empty when `from` is past the end.
    async fn read_range(&self, log: &str, from: u64) -> StoreResult<Vec<Fact>>;
}
