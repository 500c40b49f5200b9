use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid container name {name:?}: {reason}")]
    InvalidContainerName { name: String, reason: String },

    #[error("invalid object name {name:?}: {reason}")]
    InvalidObjectName { name: String, reason: String },

    #[error("invalid timestamp {value:?}: expected RFC 3339 or YYYY-MM-DD")]
    InvalidTimestamp { value: String },
}
