use lockledger_store::StoreError;
use lockledger_types::{ledger_object_name, Generation, TypeError};

use crate::codec::CodecError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger changed since the caller read it.
    ///
    /// `mutated` names the objects whose edits already took effect before the
    /// conflict was detected. Those edits are not rolled back; the caller
    /// must reload the ledger rather than assume nothing happened.
    #[error(
        "ledger conflict in {container}: expected version {}, found {}; {} object edit(s) already applied, reload and resubmit",
        version_label(.expected),
        version_label(.found),
        .mutated.len()
    )]
    Conflict {
        container: String,
        expected: Option<Generation>,
        found: Option<Generation>,
        object: Option<String>,
        mutated: Vec<String>,
    },

    /// A batch stopped part-way because the store failed.
    ///
    /// Edits listed in `mutated` took effect; the ledger was not committed.
    #[error("batch in {container} interrupted at {object} after {} applied edit(s): {source}", .mutated.len())]
    Interrupted {
        container: String,
        object: String,
        mutated: Vec<String>,
        #[source]
        source: StoreError,
    },

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("store unavailable for {container}: {source}")]
    StoreUnavailable {
        container: String,
        #[source]
        source: StoreError,
    },

    #[error("corrupt ledger in {container}: {source}")]
    Corrupt {
        container: String,
        #[source]
        source: CodecError,
    },

    #[error("{name} is the ledger object of {container} and cannot be edited")]
    ReservedName { container: String, name: String },

    #[error(transparent)]
    InvalidName(#[from] TypeError),
}

impl LedgerError {
    /// Map a store failure observed while working on `container`.
    pub fn from_store(container: &str, source: StoreError) -> Self {
        match source {
            StoreError::ContainerNotFound(name) => LedgerError::ContainerNotFound(name),
            source => LedgerError::StoreUnavailable {
                container: container.to_string(),
                source,
            },
        }
    }

    /// Returns `true` for version conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }

    /// Object names whose edits took effect before this error.
    pub fn mutated(&self) -> &[String] {
        match self {
            LedgerError::Conflict { mutated, .. } | LedgerError::Interrupted { mutated, .. } => {
                mutated
            }
            _ => &[],
        }
    }

    /// Attach the list of already-applied edits to a failed ledger commit.
    ///
    /// A conflict keeps its variant. A store failure after edits landed
    /// becomes [`LedgerError::Interrupted`] at the ledger object, so the
    /// applied edits are never reported as a bare outage.
    pub(crate) fn with_mutated(self, applied: Vec<String>) -> Self {
        match self {
            LedgerError::Conflict {
                container,
                expected,
                found,
                object,
                ..
            } => LedgerError::Conflict {
                container,
                expected,
                found,
                object,
                mutated: applied,
            },
            LedgerError::StoreUnavailable { container, source } if !applied.is_empty() => {
                LedgerError::Interrupted {
                    object: ledger_object_name(&container),
                    container,
                    mutated: applied,
                    source,
                }
            }
            other => other,
        }
    }

    /// Attach the conflicting object's name to a conflict.
    pub(crate) fn with_object(mut self, name: &str) -> Self {
        if let LedgerError::Conflict { object, .. } = &mut self {
            *object = Some(name.to_string());
        }
        self
    }
}

fn version_label(version: &Option<Generation>) -> String {
    match version {
        Some(generation) => generation.to_string(),
        None => "none".into(),
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
