use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content version of a stored object.
///
/// A new generation is assigned by the store on every content write. The
/// ledger object's generation is the ledger's version and the only token
/// accepted as a commit precondition. Metadata patches never change it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generation({})", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Generation {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Full version of an object: content generation plus metadata generation.
///
/// `metageneration` advances on every hold, retention, or metadata patch and
/// restarts at 1 after a content write. Two snapshots of the same object with
/// equal `ObjectVersion`s carry identical lock state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub generation: Generation,
    pub metageneration: u64,
}

impl ObjectVersion {
    pub fn new(generation: Generation, metageneration: u64) -> Self {
        Self {
            generation,
            metageneration,
        }
    }
}

impl fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.generation, self.metageneration)
    }
}

/// Live snapshot of one object's lock-relevant state, as reported by the
/// object store. This is the ground truth the ledger is reconciled against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Object name, unique within its container.
    pub name: String,
    /// Temporary hold flag.
    pub temporary_hold: bool,
    /// Retention expiry; `None` means no retention is configured.
    pub retention_expiry: Option<DateTime<Utc>>,
    /// Free-form user metadata.
    pub metadata: BTreeMap<String, String>,
    /// Last-modified time (content or metadata).
    pub updated_at: Option<DateTime<Utc>>,
    /// Current version of the object.
    pub version: ObjectVersion,
}

impl ObjectState {
    /// A fresh, unlocked object at generation `generation`.
    pub fn new(name: impl Into<String>, generation: Generation) -> Self {
        Self {
            name: name.into(),
            temporary_hold: false,
            retention_expiry: None,
            metadata: BTreeMap::new(),
            updated_at: None,
            version: ObjectVersion::new(generation, 1),
        }
    }

    pub fn with_hold(mut self, hold: bool) -> Self {
        self.temporary_hold = hold;
        self
    }

    pub fn with_retention(mut self, expiry: DateTime<Utc>) -> Self {
        self.retention_expiry = Some(expiry);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Content generation of this snapshot.
    pub fn generation(&self) -> Generation {
        self.version.generation
    }
}
