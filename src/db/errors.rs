//! Error types for the fact log engine
//!
//! Every failure a log operation can produce, with its mapping onto an
//! HTTP status code. Handlers turn these into plain-text replies.

use thiserror::Error;

use crate::store::errors::StoreError;

pub type DbResult<T> = Result<T, DbError>;

/// Errors from fact log operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The request itself is malformed: zero fact number, unusable log
    /// name, and the like.
    #[error("{0}")]
    Validation(String),

    /// An optimistic append lost: the claimed slot is not the next one.
    #[error("wrong age: next fact for this log is {expected}")]
    Conflict { expected: u64 },

    /// The log's integration rule rejected the fact.
    #[error("{0}")]
    Integration(String),

    /// The requested fact has not happened yet.
    #[error("{0}")]
    NotFound(String),

    /// Replaying recorded facts failed; the log cannot be served.
    #[error("failed to load db {log}: {reason}")]
    LoadFailed { log: String, reason: String },

    /// Durable storage misbehaved mid-operation.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The store and the reservation ledger disagree about a slot. The
    /// append is rolled back and the disagreement logged.
    #[error("impossible state: reserved fact {reserved} but store reported {reported}")]
    ImpossibleState { reserved: u64, reported: u64 },
}

impl DbError {
    /// HTTP status code this error maps onto.
    pub fn status_code(&self) -> u16 {
        match self {
            DbError::Validation(_) | DbError::Integration(_) => 400,
            DbError::NotFound(_) => 404,
            DbError::Conflict { .. } => 409,
            DbError::LoadFailed { .. } | DbError::Storage(_) | DbError::ImpossibleState { .. } => {
                500
            }
        }
    }

    /// True for failures worth an operator's attention rather than the
    /// caller's.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        assert_eq!(DbError::Validation("bad".into()).status_code(), 400);
        assert_eq!(DbError::Integration("no".into()).status_code(), 400);
        assert_eq!(DbError::NotFound("missing".into()).status_code(), 404);
        assert_eq!(DbError::Conflict { expected: 2 }.status_code(), 409);
        assert_eq!(
            DbError::LoadFailed {
                log: "a".into(),
                reason: "why".into()
            }
            .status_code(),
            500
        );
        assert_eq!(
            DbError::ImpossibleState {
                reserved: 1,
                reported: 2
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn only_5xx_count_as_server_errors() {
        assert!(!DbError::Conflict { expected: 1 }.is_server_error());
        assert!(DbError::ImpossibleState {
            reserved: 1,
            reported: 3
        }
        .is_server_error());
    }

    #[test]
    fn conflict_names_the_expected_slot() {
        let message = DbError::Conflict { expected: 7 }.to_string();
        assert!(message.contains('7'), "got: {message}");
    }
}
