//! Error types for fact stores

use std::io;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from durable fact storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying medium failed.
    #[error("io failure on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A recorded fact cannot be trusted. Corruption is never repaired
    /// silently; the log refuses to serve until an operator intervenes.
    #[error("corrupt record in log {log}: {reason}")]
    Corrupt { log: String, reason: String },

    /// The log holds fewer facts than the requested position.
    #[error("log {log} has no fact {index}")]
    MissingIndex { log: String, index: u64 },

    /// The name cannot be mapped onto the storage medium.
    #[error("log name {log:?} is not storable")]
    InvalidName { log: String },
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corrupt(log: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            log: log.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_log() {
        let err = StoreError::corrupt("demo", "bad checksum");
        assert!(err.to_string().contains("demo"));

        let err = StoreError::MissingIndex {
            log: "demo".into(),
            index: 9,
        };
        assert!(err.to_string().contains("no fact 9"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let source = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err = StoreError::io("log demo", source);
        assert!(err.to_string().contains("log demo"));
    }
}
