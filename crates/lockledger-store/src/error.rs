/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The container does not exist.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The object does not exist (or vanished before it could be mutated).
    #[error("object not found: {container}/{name}")]
    ObjectNotFound { container: String, name: String },

    /// The object is under a hold or an unexpired retention.
    #[error("object {container}/{name} is locked: {reason}")]
    ObjectLocked {
        container: String,
        name: String,
        reason: String,
    },

    /// Shortening an unexpired retention requires the unlocked override.
    #[error("retention on {container}/{name} can only be shortened with an override")]
    RetentionOverrideRequired { container: String, name: String },

    /// Transport, authentication, or backend failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Seed or payload decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns `true` if the error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ObjectNotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
