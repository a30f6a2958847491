//! # Replication Client
//!
//! Mirrors a remote log over its HTTP surface: snapshot, catch-up range,
//! then blocking reads for each next fact. See [`replicator::Replicator`].

pub mod errors;
pub mod replicator;

pub use errors::{ReplicatorError, ReplicatorResult};
pub use replicator::{Replicator, DEFAULT_RETRY_DELAY};
