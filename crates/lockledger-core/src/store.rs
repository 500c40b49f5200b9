//! Persistence of the per-container ledger object.
//!
//! The ledger lives inside the container it indexes, under
//! `<container>_locked_objects.json`. At rest the object carries a temporary
//! hold so lifecycle rules never reclaim it. Because a held object refuses
//! content writes, every write runs as three separate store calls: release
//! the hold, upload with a generation precondition, reapply the hold. The
//! sequence is not atomic. If the process dies or the store fails between
//! the first and last step, the ledger is left readable but unprotected
//! until [`LedgerStore::recover_protection`] or the next successful commit
//! puts the hold back.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use lockledger_store::{ObjectAccessor, StoreError, WritePrecondition, WriteResult};
use lockledger_types::{
    is_ledger_object, ledger_object_name, validate_container_name, validate_object_name, Clock,
    Generation, LedgerEntries, LockEntry,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::LedgerCodec;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::reconcile::{Reconciled, Reconciler};

/// A container's ledger as last read from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ledger {
    pub container: String,
    pub entries: LedgerEntries,
    /// Generation of the ledger object; the precondition for the next commit.
    pub version: Generation,
}

impl Ledger {
    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a successful commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    /// New generation of the ledger object.
    pub version: Generation,
    /// Whether the protective hold was put back after the upload.
    pub protected: bool,
}

/// What reconciling a single object did to its ledger entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SingleEntryOutcome {
    Locked(LockEntry),
    Removed,
}

/// Owns the single persisted ledger of each container.
pub struct LedgerStore<A: ObjectAccessor + ?Sized> {
    accessor: Arc<A>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    reconciler: Reconciler,
}

impl<A: ObjectAccessor + ?Sized> LedgerStore<A> {
    pub fn new(accessor: Arc<A>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self {
            accessor,
            clock,
            reconciler: Reconciler::new(config.grace_window),
            config,
        }
    }

    pub fn accessor(&self) -> &Arc<A> {
        &self.accessor
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Read and decode the ledger object, if it exists.
    ///
    /// Never touches any other object. A ledger found without its hold is
    /// returned as-is and logged; restoring the hold is left to
    /// [`recover_protection`](Self::recover_protection) because a missing hold
    /// is also what a concurrent commit looks like mid-write.
    pub fn load(&self, container: &str) -> LedgerResult<Option<Ledger>> {
        validate_container_name(container)?;
        let name = ledger_object_name(container);
        let Some(content) = self
            .accessor
            .read(container, &name)
            .map_err(|e| LedgerError::from_store(container, e))?
        else {
            return Ok(None);
        };

        let entries = LedgerCodec::decode(&content.data).map_err(|source| LedgerError::Corrupt {
            container: container.to_string(),
            source,
        })?;
        if !content.state.temporary_hold {
            warn!(container, ledger = %name, "ledger object is missing its protective hold");
        }
        let version = content.state.generation();
        debug!(container, %version, entries = entries.len(), "ledger loaded");

        Ok(Some(Ledger {
            container: container.to_string(),
            entries,
            version,
        }))
    }

    /// Load the ledger, building it from a full container scan if absent.
    pub fn bootstrap_or_load(&self, container: &str) -> LedgerResult<Ledger> {
        if let Some(ledger) = self.load(container)? {
            return Ok(ledger);
        }

        let entries = self.scan(container)?;
        let data = self.encode(container, &entries)?;
        let write = ProtectedWrite::new(self.accessor.as_ref(), container);

        match write.upload(data, WritePrecondition::DoesNotExist)? {
            WriteResult::Success { generation } => {
                let protected = write.reapply_hold();
                info!(
                    container,
                    entries = entries.len(),
                    version = %generation,
                    protected,
                    "ledger bootstrapped"
                );
                Ok(Ledger {
                    container: container.to_string(),
                    entries,
                    version: generation,
                })
            }
            WriteResult::PreconditionFailed { current } => {
                debug!(container, ?current, "ledger bootstrapped concurrently, loading");
                self.load(container)?.ok_or_else(|| LedgerError::Conflict {
                    container: container.to_string(),
                    expected: None,
                    found: current,
                    object: None,
                    mutated: Vec::new(),
                })
            }
        }
    }

    /// Reconcile every object in the container into a fresh entry map.
    ///
    /// Nothing is written.
    pub fn scan(&self, container: &str) -> LedgerResult<LedgerEntries> {
        validate_container_name(container)?;
        let objects = self
            .accessor
            .list(container, None)
            .map_err(|e| LedgerError::from_store(container, e))?;

        let now = self.now();
        let mut entries = LedgerEntries::new();
        for state in objects
            .iter()
            .filter(|state| !is_ledger_object(container, &state.name))
        {
            self.reconciler
                .reconcile(state, now)
                .apply(&state.name, &mut entries);
        }
        debug!(container, scanned = objects.len(), locked = entries.len(), "container scanned");
        Ok(entries)
    }

    /// Current generation of the ledger object, or `None` if it has not been
    /// bootstrapped.
    pub fn current_version(&self, container: &str) -> LedgerResult<Option<Generation>> {
        validate_container_name(container)?;
        let state = self
            .accessor
            .get(container, &ledger_object_name(container))
            .map_err(|e| LedgerError::from_store(container, e))?;
        Ok(state.map(|state| state.generation()))
    }

    /// Replace the ledger's content, provided its generation is still `expected`.
    ///
    /// A generation mismatch fails with [`LedgerError::Conflict`] and writes
    /// nothing, as does finding the hold back on the ledger after releasing it. The hold is reapplied whether or not the upload landed.
    pub fn commit(
        &self,
        container: &str,
        entries: &LedgerEntries,
        expected: Generation,
    ) -> LedgerResult<CommitReceipt> {
        validate_container_name(container)?;
        let data = self.encode(container, entries)?;
        let write = ProtectedWrite::new(self.accessor.as_ref(), container);

        write.release_hold()?;
        match write.upload(data, WritePrecondition::MatchesGeneration(expected)) {
            Ok(WriteResult::Success { generation }) => {
                let protected = write.reapply_hold();
                info!(
                    container,
                    entries = entries.len(),
                    from = %expected,
                    to = %generation,
                    protected,
                    "ledger committed"
                );
                Ok(CommitReceipt {
                    version: generation,
                    protected,
                })
            }
            Ok(WriteResult::PreconditionFailed { current }) => {
                if current.is_some() {
                    write.reapply_hold();
                }
                warn!(container, %expected, found = ?current, "ledger commit conflict");
                Err(LedgerError::Conflict {
                    container: container.to_string(),
                    expected: Some(expected),
                    found: current,
                    object: None,
                    mutated: Vec::new(),
                })
            }
            Err(err) => {
                write.reapply_hold();
                Err(err)
            }
        }
    }

    /// Re-read one object, reconcile it, and commit the merged ledger.
    ///
    /// The commit is skipped when the entry is already up to date.
    pub fn update_single_entry(
        &self,
        container: &str,
        name: &str,
    ) -> LedgerResult<SingleEntryOutcome> {
        validate_object_name(name)?;
        self.ensure_not_reserved(container, name)?;

        let ledger = self.bootstrap_or_load(container)?;
        let state = self
            .accessor
            .get(container, name)
            .map_err(|e| LedgerError::from_store(container, e))?;

        let reconciled = match &state {
            Some(state) => self.reconciler.reconcile(state, self.now()),
            None => Reconciled::NotLocked,
        };
        let outcome = match &reconciled {
            Reconciled::Locked(entry) => SingleEntryOutcome::Locked(entry.clone()),
            Reconciled::NotLocked => SingleEntryOutcome::Removed,
        };

        let mut entries = ledger.entries;
        if reconciled.apply(name, &mut entries) {
            self.commit(container, &entries, ledger.version)
                .map_err(|e| e.with_object(name))?;
        } else {
            debug!(container, name, "ledger entry already current");
        }
        Ok(outcome)
    }

    /// Put the hold back on a ledger object that lost it.
    ///
    /// Run once per container at startup, before serving commits. Returns
    /// `true` if the hold had to be reapplied.
    pub fn recover_protection(&self, container: &str) -> LedgerResult<bool> {
        validate_container_name(container)?;
        let name = ledger_object_name(container);
        let state = self
            .accessor
            .get(container, &name)
            .map_err(|e| LedgerError::from_store(container, e))?;

        match state {
            Some(state) if !state.temporary_hold => {
                self.accessor
                    .set_hold(container, &name, true)
                    .map_err(|e| LedgerError::from_store(container, e))?;
                info!(container, ledger = %name, "reapplied missing ledger hold");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn ensure_not_reserved(&self, container: &str, name: &str) -> LedgerResult<()> {
        if is_ledger_object(container, name) {
            return Err(LedgerError::ReservedName {
                container: container.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn encode(&self, container: &str, entries: &LedgerEntries) -> LedgerResult<Bytes> {
        LedgerCodec::encode(entries).map_err(|source| LedgerError::Corrupt {
            container: container.to_string(),
            source,
        })
    }
}

/// The release/upload/reapply sequence around one ledger write.
struct ProtectedWrite<'a, A: ObjectAccessor + ?Sized> {
    accessor: &'a A,
    container: &'a str,
    name: String,
}

impl<'a, A: ObjectAccessor + ?Sized> ProtectedWrite<'a, A> {
    fn new(accessor: &'a A, container: &'a str) -> Self {
        Self {
            accessor,
            container,
            name: ledger_object_name(container),
        }
    }

    /// A missing ledger has no hold to release; the upload's precondition
    /// reports it.
    fn release_hold(&self) -> LedgerResult<()> {
        match self.accessor.set_hold(self.container, &self.name, false) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(LedgerError::from_store(self.container, e)),
        }
    }

    /// A hold found on the ledger after our release means another writer's
    /// commit ran in between. That is contention, reported as a conflict.
    fn upload(&self, data: Bytes, precondition: WritePrecondition) -> LedgerResult<WriteResult> {
        match self
            .accessor
            .write(self.container, &self.name, data, precondition)
        {
            Ok(result) => Ok(result),
            Err(StoreError::ObjectLocked { reason, .. }) => {
                let found = self
                    .accessor
                    .get(self.container, &self.name)
                    .ok()
                    .flatten()
                    .map(|state| state.generation());
                warn!(
                    container = self.container,
                    ledger = %self.name,
                    %reason,
                    "ledger relocked by a concurrent writer"
                );
                Err(LedgerError::Conflict {
                    container: self.container.to_string(),
                    expected: match precondition {
                        WritePrecondition::MatchesGeneration(expected) => Some(expected),
                        _ => None,
                    },
                    found,
                    object: None,
                    mutated: Vec::new(),
                })
            }
            Err(e) => Err(LedgerError::from_store(self.container, e)),
        }
    }

    fn reapply_hold(&self) -> bool {
        match self.accessor.set_hold(self.container, &self.name, true) {
            Ok(_) => true,
            Err(error) => {
                warn!(
                    container = self.container,
                    ledger = %self.name,
                    %error,
                    "ledger left without its hold until recovery"
                );
                false
            }
        }
    }
}
