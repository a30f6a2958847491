//! Replication client error types.

use thiserror::Error;

use crate::db::DbError;

/// Result type for replication client operations
pub type ReplicatorResult<T> = Result<T, ReplicatorError>;

/// Anything that breaks a sync pass.
///
/// The replicator does not distinguish causes when recovering: every
/// variant triggers the same full resync after the retry delay. The
/// variants exist for logging and for embedders that want to inspect
/// why a pass ended.
#[derive(Debug, Error)]
pub enum ReplicatorError {
    /// Request never completed or the body could not be decoded.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The local rule rejected a fact the server committed. The local
    /// rule disagrees with the server's; resyncing will not fix it, but
    /// retrying keeps the mirror alive if the server is later corrected.
    #[error("local integration failed: {0}")]
    Integration(#[from] DbError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_errors_wrap_rule_rejections() {
        let err: ReplicatorError = DbError::Integration("unrecognized fact: nope".to_string()).into();
        assert!(matches!(err, ReplicatorError::Integration(_)));
        assert!(err.to_string().contains("unrecognized fact"));
    }
}
