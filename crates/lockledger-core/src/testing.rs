//! Shared fixtures for the core's unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use lockledger_store::{
    InMemoryAccessor, ObjectAccessor, SeedObject, StoreError, StoreResult, StoredContent,
    WritePrecondition, WriteResult,
};
use lockledger_types::{is_ledger_object, ledger_object_name, FixedClock, ObjectState};

use crate::config::LedgerConfig;
use crate::store::LedgerStore;

pub(crate) const CONTAINER: &str = "docs";

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 31, 12, 0, 0).unwrap()
}

pub(crate) struct Fixture<A: ObjectAccessor + ?Sized> {
    pub memory: Arc<InMemoryAccessor>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<LedgerStore<A>>,
}

impl<A: ObjectAccessor + ?Sized> Fixture<A> {
    pub fn seed(&self, object: SeedObject) -> ObjectState {
        self.memory.insert(CONTAINER, object).unwrap()
    }

    pub fn ledger_state(&self) -> ObjectState {
        self.memory
            .get(CONTAINER, &ledger_object_name(CONTAINER))
            .unwrap()
            .expect("ledger object exists")
    }
}

fn memory() -> (Arc<InMemoryAccessor>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(t0()));
    let memory = Arc::new(InMemoryAccessor::with_clock(clock.clone()));
    memory.create_container(CONTAINER).unwrap();
    (memory, clock)
}

/// A ledger store over a plain in-memory backend with one empty container.
pub(crate) fn fixture() -> Fixture<InMemoryAccessor> {
    let (memory, clock) = memory();
    let store = Arc::new(LedgerStore::new(
        memory.clone(),
        clock.clone(),
        LedgerConfig::default(),
    ));
    Fixture {
        memory,
        clock,
        store,
    }
}

/// A ledger store over a [`ScriptedAccessor`].
pub(crate) fn scripted_fixture() -> (Fixture<ScriptedAccessor>, Arc<ScriptedAccessor>) {
    let (memory, clock) = memory();
    let scripted = Arc::new(ScriptedAccessor::new(memory.clone()));
    let store = Arc::new(LedgerStore::new(
        scripted.clone(),
        clock.clone(),
        LedgerConfig::default(),
    ));
    (
        Fixture {
            memory,
            clock,
            store,
        },
        scripted,
    )
}

/// Runs against the backend around a ledger write.
pub(crate) type LedgerHook = Box<dyn FnOnce(&InMemoryAccessor) + Send>;

/// Wraps the in-memory backend and injects failures and interleavings.
pub(crate) struct ScriptedAccessor {
    inner: Arc<InMemoryAccessor>,
    fail_ledger_hold: AtomicBool,
    fail_patches_of: Mutex<Option<String>>,
    race_next_patch: AtomicBool,
    before_ledger_write: Mutex<Option<LedgerHook>>,
    after_ledger_write: Mutex<Option<LedgerHook>>,
}

impl ScriptedAccessor {
    fn new(inner: Arc<InMemoryAccessor>) -> Self {
        Self {
            inner,
            fail_ledger_hold: AtomicBool::new(false),
            fail_patches_of: Mutex::new(None),
            race_next_patch: AtomicBool::new(false),
            before_ledger_write: Mutex::new(None),
            after_ledger_write: Mutex::new(None),
        }
    }

    /// Run `hook` just before the next upload of a ledger object.
    pub fn before_next_ledger_write(
        &self,
        hook: impl FnOnce(&InMemoryAccessor) + Send + 'static,
    ) {
        *self.before_ledger_write.lock().unwrap() = Some(Box::new(hook));
    }

    /// Run `hook` just after the next upload of a ledger object.
    pub fn after_next_ledger_write(
        &self,
        hook: impl FnOnce(&InMemoryAccessor) + Send + 'static,
    ) {
        *self.after_ledger_write.lock().unwrap() = Some(Box::new(hook));
    }

    fn run_hook(&self, slot: &Mutex<Option<LedgerHook>>) {
        let hook = slot.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
    }

    /// Make every attempt to set the hold on a ledger object fail.
    pub fn fail_ledger_hold(&self, fail: bool) {
        self.fail_ledger_hold.store(fail, Ordering::SeqCst);
    }

    /// Make every patch of `name` fail as if the backend dropped out.
    pub fn fail_patches_of(&self, name: &str) {
        *self.fail_patches_of.lock().unwrap() = Some(name.to_string());
    }

    /// Before the next object patch, let a concurrent writer rewrite the ledger.
    pub fn race_next_patch(&self) {
        self.race_next_patch.store(true, Ordering::SeqCst);
    }

    fn before_patch(&self, container: &str, name: &str) -> StoreResult<()> {
        if self.fail_patches_of.lock().unwrap().as_deref() == Some(name) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        if !is_ledger_object(container, name) && self.race_next_patch.swap(false, Ordering::SeqCst)
        {
            let ledger = ledger_object_name(container);
            let content = self.inner.read(container, &ledger)?.expect("ledger exists");
            self.inner.set_hold(container, &ledger, false)?;
            self.inner
                .write(container, &ledger, content.data, WritePrecondition::None)?;
            self.inner.set_hold(container, &ledger, true)?;
        }
        Ok(())
    }
}

impl ObjectAccessor for ScriptedAccessor {
    fn container_exists(&self, container: &str) -> StoreResult<bool> {
        self.inner.container_exists(container)
    }

    fn get(&self, container: &str, name: &str) -> StoreResult<Option<ObjectState>> {
        self.inner.get(container, name)
    }

    fn list(&self, container: &str, prefix: Option<&str>) -> StoreResult<Vec<ObjectState>> {
        self.inner.list(container, prefix)
    }

    fn read(&self, container: &str, name: &str) -> StoreResult<Option<StoredContent>> {
        self.inner.read(container, name)
    }

    fn set_hold(&self, container: &str, name: &str, hold: bool) -> StoreResult<ObjectState> {
        if hold && is_ledger_object(container, name) && self.fail_ledger_hold.load(Ordering::SeqCst)
        {
            return Err(StoreError::Unavailable("injected hold failure".into()));
        }
        self.before_patch(container, name)?;
        self.inner.set_hold(container, name, hold)
    }

    fn set_retention(
        &self,
        container: &str,
        name: &str,
        expiry: DateTime<Utc>,
        override_unlocked: bool,
    ) -> StoreResult<ObjectState> {
        self.before_patch(container, name)?;
        self.inner
            .set_retention(container, name, expiry, override_unlocked)
    }

    fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> StoreResult<ObjectState> {
        self.before_patch(container, name)?;
        self.inner.set_metadata(container, name, metadata)
    }

    fn write(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> StoreResult<WriteResult> {
        if !is_ledger_object(container, name) {
            return self.inner.write(container, name, data, precondition);
        }
        self.run_hook(&self.before_ledger_write);
        let result = self.inner.write(container, name, data, precondition);
        self.run_hook(&self.after_ledger_write);
        result
    }

    fn delete(&self, container: &str, name: &str) -> StoreResult<bool> {
        self.inner.delete(container, name)
    }
}
