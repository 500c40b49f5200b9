//! Batched object edits with a single ledger commit.
//!
//! A batch is validated against the ledger version the caller last saw,
//! then each edit is applied to its object in list order and reconciled into
//! an in-memory copy of the ledger, which is committed once at the end.
//! Object edits are not transactional with the commit: if the commit
//! conflicts or the store fails during it, the edits already applied stay
//! applied and are listed in the error so the caller knows to reload.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lockledger_store::{ObjectAccessor, StoreError, StoreResult};
use lockledger_types::{validate_container_name, validate_object_name, Generation, ObjectState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

/// Requested lock change for one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub temporary_hold: bool,
    /// Retention expiry to set. Used as given when it lies in the future;
    /// a missing or past expiry falls back to now plus the grace window.
    #[serde(default)]
    pub hold_expiry: Option<DateTime<Utc>>,
}

impl LockStatus {
    pub fn held() -> Self {
        Self {
            temporary_hold: true,
            hold_expiry: None,
        }
    }

    pub fn released() -> Self {
        Self {
            temporary_hold: false,
            hold_expiry: None,
        }
    }

    pub fn until(mut self, expiry: DateTime<Utc>) -> Self {
        self.hold_expiry = Some(expiry);
        self
    }
}

/// One requested edit: replace metadata and/or change the lock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEdit {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub lock_status: Option<LockStatus>,
}

impl ObjectEdit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_lock(mut self, lock_status: LockStatus) -> Self {
        self.lock_status = Some(lock_status);
        self
    }

    fn mutates(&self) -> bool {
        self.metadata.is_some() || self.lock_status.is_some()
    }
}

/// Summary of a committed batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub container: String,
    /// Edits applied to objects that still exist.
    pub updated: usize,
    /// Edits whose object no longer exists; their entries were dropped.
    pub dropped: Vec<String>,
    /// Ledger version after the commit.
    pub version: Generation,
    pub protected: bool,
}

impl BatchReport {
    pub fn message(&self) -> String {
        if self.dropped.is_empty() {
            format!("{} file(s) updated in {}", self.updated, self.container)
        } else {
            format!(
                "{} file(s) updated in {}, {} no longer exist",
                self.updated,
                self.container,
                self.dropped.len()
            )
        }
    }
}

/// A batch aimed at one container, as part of a multi-container request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerBatch {
    pub container: String,
    pub expected: Generation,
    pub edits: Vec<ObjectEdit>,
}

/// Per-container result of [`BatchUpdater::batch_update_many`].
#[derive(Debug)]
pub struct ContainerOutcome {
    pub container: String,
    pub result: LedgerResult<BatchReport>,
}

enum EditOutcome {
    Applied(ObjectState),
    Vanished,
}

/// Applies edit lists to objects and commits the resulting ledger.
pub struct BatchUpdater<A: ObjectAccessor + ?Sized> {
    store: Arc<LedgerStore<A>>,
}

impl<A: ObjectAccessor + ?Sized> BatchUpdater<A> {
    pub fn new(store: Arc<LedgerStore<A>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<LedgerStore<A>> {
        &self.store
    }

    /// Apply `edits` in order and commit the ledger against `expected`.
    ///
    /// Fails with a conflict before touching any object if the ledger is no
    /// longer at `expected`.
    pub fn batch_update(
        &self,
        container: &str,
        expected: Generation,
        edits: &[ObjectEdit],
    ) -> LedgerResult<BatchReport> {
        validate_container_name(container)?;
        for edit in edits {
            validate_object_name(&edit.name)?;
            self.store.ensure_not_reserved(container, &edit.name)?;
        }

        let ledger = self.store.load(container)?;
        let found = ledger.as_ref().map(|ledger| ledger.version);
        let Some(ledger) = ledger.filter(|ledger| ledger.version == expected) else {
            warn!(container, %expected, ?found, "batch rejected against stale ledger");
            return Err(LedgerError::Conflict {
                container: container.to_string(),
                expected: Some(expected),
                found,
                object: None,
                mutated: Vec::new(),
            });
        };

        let now = self.store.now();
        let mut entries = ledger.entries;
        let mut mutated = Vec::new();
        let mut dropped = Vec::new();
        let mut updated = 0;

        for edit in edits {
            match self.apply_edit(container, edit, now) {
                Ok(EditOutcome::Applied(state)) => {
                    self.store
                        .reconciler()
                        .reconcile(&state, now)
                        .apply(&edit.name, &mut entries);
                    if edit.mutates() {
                        mutated.push(edit.name.clone());
                    }
                    updated += 1;
                }
                Ok(EditOutcome::Vanished) => {
                    debug!(container, name = %edit.name, "object vanished, dropping entry");
                    entries.remove(&edit.name);
                    dropped.push(edit.name.clone());
                }
                Err(source) => {
                    warn!(container, name = %edit.name, error = %source, "batch interrupted");
                    return Err(LedgerError::Interrupted {
                        container: container.to_string(),
                        object: edit.name.clone(),
                        mutated,
                        source,
                    });
                }
            }
        }

        let receipt = self
            .store
            .commit(container, &entries, expected)
            .map_err(|e| e.with_mutated(mutated))?;
        info!(
            container,
            updated,
            dropped = dropped.len(),
            version = %receipt.version,
            "batch committed"
        );

        Ok(BatchReport {
            container: container.to_string(),
            updated,
            dropped,
            version: receipt.version,
            protected: receipt.protected,
        })
    }

    /// Run one batch per container. A failing container does not stop the rest.
    pub fn batch_update_many(&self, batches: Vec<ContainerBatch>) -> Vec<ContainerOutcome> {
        batches
            .into_iter()
            .map(|batch| {
                let result = self.batch_update(&batch.container, batch.expected, &batch.edits);
                if let Err(error) = &result {
                    warn!(container = %batch.container, %error, "container batch skipped");
                }
                ContainerOutcome {
                    container: batch.container,
                    result,
                }
            })
            .collect()
    }

    fn apply_edit(
        &self,
        container: &str,
        edit: &ObjectEdit,
        now: DateTime<Utc>,
    ) -> StoreResult<EditOutcome> {
        let accessor = self.store.accessor();
        let Some(mut state) = accessor.get(container, &edit.name)? else {
            return Ok(EditOutcome::Vanished);
        };

        if let Some(metadata) = &edit.metadata {
            let Some(patched) = present(accessor.set_metadata(container, &edit.name, metadata.clone()))?
            else {
                return Ok(EditOutcome::Vanished);
            };
            state = patched;
        }

        if let Some(lock) = &edit.lock_status {
            if present(accessor.set_hold(container, &edit.name, lock.temporary_hold))?.is_none() {
                return Ok(EditOutcome::Vanished);
            }

            let expiry = lock
                .hold_expiry
                .filter(|expiry| *expiry > now)
                .unwrap_or(now + self.store.config().grace_window);
            let Some(patched) = present(accessor.set_retention(container, &edit.name, expiry, true))?
            else {
                return Ok(EditOutcome::Vanished);
            };
            state = patched;
        }

        Ok(EditOutcome::Applied(state))
    }
}

/// Treat "object not found" as an absent object rather than a failure.
fn present(result: StoreResult<ObjectState>) -> StoreResult<Option<ObjectState>> {
    match result {
        Ok(state) => Ok(Some(state)),
        Err(StoreError::ObjectNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, scripted_fixture, t0, CONTAINER};
    use chrono::Duration;
    use lockledger_store::SeedObject;
    use lockledger_types::ledger_object_name;

    fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn holding_an_unlocked_object_adds_its_entry() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();
        assert!(ledger.get("a.txt").is_none());

        let updater = BatchUpdater::new(fx.store.clone());
        let report = updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[ObjectEdit::new("a.txt").with_lock(LockStatus::held())],
            )
            .unwrap();
        assert_eq!(report.updated, 1);
        assert!(report.dropped.is_empty());

        let reloaded = fx.store.bootstrap_or_load(CONTAINER).unwrap();
        assert!(reloaded.get("a.txt").unwrap().temporary_hold);
        assert_eq!(reloaded.version, report.version);
    }

    #[test]
    fn releasing_without_expiry_retains_only_for_the_grace_window() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt").held());
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[ObjectEdit::new("a.txt").with_lock(LockStatus::released())],
            )
            .unwrap();

        let state = fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap();
        assert!(!state.temporary_hold);
        assert_eq!(state.retention_expiry, Some(t0() + Duration::seconds(30)));
        assert!(fx.store.load(CONTAINER).unwrap().unwrap().is_empty());
    }

    #[test]
    fn future_expiry_beyond_grace_locks_without_hold() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();
        let expiry = t0() + Duration::days(7);

        let updater = BatchUpdater::new(fx.store.clone());
        updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[ObjectEdit::new("a.txt").with_lock(LockStatus::released().until(expiry))],
            )
            .unwrap();

        let entry = fx.store.load(CONTAINER).unwrap().unwrap().entries["a.txt"].clone();
        assert!(!entry.temporary_hold);
        assert_eq!(entry.expiration_date, Some(expiry));
    }

    #[test]
    fn past_expiry_falls_back_to_grace_window() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[ObjectEdit::new("a.txt")
                    .with_lock(LockStatus::released().until(t0() - Duration::days(1)))],
            )
            .unwrap();

        let state = fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap();
        assert_eq!(state.retention_expiry, Some(t0() + Duration::seconds(30)));
    }

    #[test]
    fn metadata_is_replaced_and_mirrored() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt").held().with_metadata("old", "1"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[ObjectEdit::new("a.txt").with_metadata(meta(&[("case", "42")]))],
            )
            .unwrap();

        let state = fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap();
        assert_eq!(state.metadata, meta(&[("case", "42")]));
        let entry = fx.store.load(CONTAINER).unwrap().unwrap().entries["a.txt"].clone();
        assert_eq!(entry.metadata, state.metadata);
        assert!(!entry.is_stale(&state));
    }

    #[test]
    fn vanished_objects_are_dropped_and_the_rest_succeeds() {
        let fx = fixture();
        fx.seed(SeedObject::new("stale.txt").held());
        fx.seed(SeedObject::new("b.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();
        assert!(ledger.get("stale.txt").is_some());

        fx.memory.set_hold(CONTAINER, "stale.txt", false).unwrap();
        fx.memory.delete(CONTAINER, "stale.txt").unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        let report = updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[
                    ObjectEdit::new("stale.txt").with_lock(LockStatus::held()),
                    ObjectEdit::new("never.txt").with_lock(LockStatus::held()),
                    ObjectEdit::new("b.txt").with_lock(LockStatus::held()),
                ],
            )
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.dropped, ["stale.txt", "never.txt"]);
        let current = fx.store.load(CONTAINER).unwrap().unwrap();
        assert!(current.get("stale.txt").is_none());
        assert!(current.get("never.txt").is_none());
        assert!(current.get("b.txt").is_some());
    }

    #[test]
    fn edits_apply_in_list_order() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        let report = updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[
                    ObjectEdit::new("a.txt").with_lock(LockStatus::held()),
                    ObjectEdit::new("a.txt").with_lock(LockStatus::released()),
                ],
            )
            .unwrap();

        assert_eq!(report.updated, 2);
        assert!(fx.store.load(CONTAINER).unwrap().unwrap().is_empty());
    }

    #[test]
    fn stale_expected_version_conflicts_before_mutating() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        let v1 = fx.store.bootstrap_or_load(CONTAINER).unwrap();
        let v2 = fx.store.commit(CONTAINER, &v1.entries, v1.version).unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        let err = updater
            .batch_update(
                CONTAINER,
                v1.version,
                &[ObjectEdit::new("a.txt").with_lock(LockStatus::held())],
            )
            .unwrap_err();

        match &err {
            LedgerError::Conflict {
                expected,
                found,
                mutated,
                ..
            } => {
                assert_eq!(*expected, Some(v1.version));
                assert_eq!(*found, Some(v2.version));
                assert!(mutated.is_empty());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(!fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap().temporary_hold);
        assert_eq!(fx.store.current_version(CONTAINER).unwrap(), Some(v2.version));
    }

    #[test]
    fn missing_ledger_is_a_conflict() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));

        let updater = BatchUpdater::new(fx.store.clone());
        let err = updater
            .batch_update(CONTAINER, Generation::new(1), &[ObjectEdit::new("a.txt")])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { found: None, .. }));
    }

    #[test]
    fn concurrent_commit_surfaces_applied_edits() {
        let (fx, scripted) = scripted_fixture();
        fx.seed(SeedObject::new("a.txt"));
        fx.seed(SeedObject::new("b.txt"));
        let v1 = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        scripted.race_next_patch();
        let updater = BatchUpdater::new(fx.store.clone());
        let err = updater
            .batch_update(
                CONTAINER,
                v1.version,
                &[
                    ObjectEdit::new("a.txt").with_lock(LockStatus::held()),
                    ObjectEdit::new("b.txt").with_metadata(meta(&[("k", "v")])),
                ],
            )
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(err.mutated(), ["a.txt".to_string(), "b.txt".to_string()]);
        assert!(err.to_string().contains("reload"));

        // The object edits stuck; the batch's ledger write did not.
        assert!(fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap().temporary_hold);
        let current = fx.store.load(CONTAINER).unwrap().unwrap();
        assert_ne!(current.version, v1.version);
        assert!(current.get("a.txt").is_none());
        assert!(fx.ledger_state().temporary_hold);
    }

    #[test]
    fn store_failure_mid_batch_is_interrupted() {
        let (fx, scripted) = scripted_fixture();
        fx.seed(SeedObject::new("a.txt"));
        fx.seed(SeedObject::new("b.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        scripted.fail_patches_of("b.txt");
        let updater = BatchUpdater::new(fx.store.clone());
        let err = updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[
                    ObjectEdit::new("a.txt").with_lock(LockStatus::held()),
                    ObjectEdit::new("b.txt").with_lock(LockStatus::held()),
                ],
            )
            .unwrap_err();

        match &err {
            LedgerError::Interrupted { object, mutated, .. } => {
                assert_eq!(object, "b.txt");
                assert_eq!(mutated, &["a.txt".to_string()]);
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert_eq!(fx.store.current_version(CONTAINER).unwrap(), Some(ledger.version));
    }

    #[test]
    fn failed_commit_after_edits_lists_them() {
        let (fx, scripted) = scripted_fixture();
        fx.seed(SeedObject::new("a.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        // The commit cannot release the ledger's hold.
        scripted.fail_patches_of(&ledger_object_name(CONTAINER));
        let updater = BatchUpdater::new(fx.store.clone());
        let err = updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[ObjectEdit::new("a.txt").with_lock(LockStatus::held())],
            )
            .unwrap_err();

        match &err {
            LedgerError::Interrupted { object, mutated, .. } => {
                assert_eq!(object, &ledger_object_name(CONTAINER));
                assert_eq!(mutated, &["a.txt".to_string()]);
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert!(fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap().temporary_hold);
        assert_eq!(fx.store.current_version(CONTAINER).unwrap(), Some(ledger.version));
    }

    #[test]
    fn ledger_object_cannot_be_edited() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        let ledger = fx.store.bootstrap_or_load(CONTAINER).unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        let err = updater
            .batch_update(
                CONTAINER,
                ledger.version,
                &[
                    ObjectEdit::new("a.txt").with_lock(LockStatus::held()),
                    ObjectEdit::new(ledger_object_name(CONTAINER)).with_lock(LockStatus::released()),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, LedgerError::ReservedName { .. }));
        assert!(!fx.memory.get(CONTAINER, "a.txt").unwrap().unwrap().temporary_hold);
    }

    #[test]
    fn many_containers_fail_independently() {
        let fx = fixture();
        fx.seed(SeedObject::new("a.txt"));
        fx.memory.create_container("archive").unwrap();
        fx.memory.insert("archive", SeedObject::new("old.txt")).unwrap();

        let docs = fx.store.bootstrap_or_load(CONTAINER).unwrap();
        let archive = fx.store.bootstrap_or_load("archive").unwrap();

        let updater = BatchUpdater::new(fx.store.clone());
        let outcomes = updater.batch_update_many(vec![
            ContainerBatch {
                container: "missing".into(),
                expected: Generation::new(1),
                edits: vec![ObjectEdit::new("x").with_lock(LockStatus::held())],
            },
            ContainerBatch {
                container: CONTAINER.into(),
                expected: docs.version,
                edits: vec![ObjectEdit::new("a.txt").with_lock(LockStatus::held())],
            },
            ContainerBatch {
                container: "archive".into(),
                expected: archive.version,
                edits: vec![ObjectEdit::new("old.txt").with_lock(LockStatus::held())],
            },
        ]);

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0].result, Err(LedgerError::ContainerNotFound(_))));
        assert_eq!(outcomes[1].result.as_ref().unwrap().updated, 1);
        assert_eq!(outcomes[2].result.as_ref().unwrap().updated, 1);
        assert!(fx.store.load("archive").unwrap().unwrap().get("old.txt").is_some());
    }

    #[test]
    fn report_message_counts_edits() {
        let report = BatchReport {
            container: "docs".into(),
            updated: 2,
            dropped: vec!["gone.txt".into()],
            version: Generation::new(9),
            protected: true,
        };
        assert_eq!(report.message(), "2 file(s) updated in docs, 1 no longer exist");
    }
}
