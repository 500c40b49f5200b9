//! Ledger entry types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::{ObjectState, ObjectVersion};

/// The ledger's full content: object name → cached lock state.
///
/// Presence of a name is the sole signal that the object is locked from the
/// ledger's point of view. A `BTreeMap` keeps encoded ledgers byte-stable.
pub type LedgerEntries = BTreeMap<String, LockEntry>;

/// Cached lock state of one locked object, as of its last reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Object name, unique within the container.
    pub name: String,
    /// Mirrors the object's temporary hold flag.
    pub temporary_hold: bool,
    /// The object's retention expiry.
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Free-form user metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// The object's last-modified time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// The object's version when this entry was built.
    #[serde(default)]
    pub version: Option<ObjectVersion>,
}

impl LockEntry {
    /// Build an entry mirroring `state`, tagged with its version.
    pub fn from_state(state: &ObjectState) -> Self {
        Self {
            name: state.name.clone(),
            temporary_hold: state.temporary_hold,
            expiration_date: state.retention_expiry,
            metadata: state.metadata.clone(),
            updated_at: state.updated_at,
            version: Some(state.version),
        }
    }

    /// Returns `true` if the object has changed since this entry was built.
    ///
    /// Entries without a version token are always considered stale.
    pub fn is_stale(&self, live: &ObjectState) -> bool {
        self.version != Some(live.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Generation;

    fn held(name: &str) -> ObjectState {
        ObjectState::new(name, Generation::new(5))
            .with_hold(true)
            .with_metadata("owner", "legal")
    }

    #[test]
    fn from_state_copies_lock_fields() {
        let state = held("a.txt");
        let entry = LockEntry::from_state(&state);
        assert_eq!(entry.name, "a.txt");
        assert!(entry.temporary_hold);
        assert_eq!(entry.metadata, state.metadata);
        assert_eq!(entry.version, Some(state.version));
    }

    #[test]
    fn entry_is_fresh_until_object_changes() {
        let mut state = held("a.txt");
        let entry = LockEntry::from_state(&state);
        assert!(!entry.is_stale(&state));

        state.version.metageneration += 1;
        assert!(entry.is_stale(&state));
    }

    #[test]
    fn untagged_entry_is_stale() {
        let state = held("a.txt");
        let mut entry = LockEntry::from_state(&state);
        entry.version = None;
        assert!(entry.is_stale(&state));
    }

    #[test]
    fn serialized_field_names() {
        let entry = LockEntry::from_state(&held("a.txt"));
        let value = serde_json::to_value(&entry).unwrap();
        for field in [
            "name",
            "temporary_hold",
            "expiration_date",
            "metadata",
            "updated_at",
            "version",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn missing_optional_fields_default() {
        let entry: LockEntry =
            serde_json::from_str(r#"{"name":"b.txt","temporary_hold":false}"#).unwrap();
        assert!(entry.expiration_date.is_none());
        assert!(entry.metadata.is_empty());
        assert!(entry.version.is_none());
    }
}
