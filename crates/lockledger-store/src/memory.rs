//! In-memory object store for tests, demos, and embedding.
//!
//! [`InMemoryAccessor`] keeps every container in a `HashMap` behind a
//! `RwLock` and enforces the same hold/retention rules as a real bucket, so
//! the ledger's protected-write sequence behaves exactly as it would
//! against remote storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use lockledger_types::{Clock, Generation, ObjectState, ObjectVersion, SystemClock};
use serde::Deserialize;

use crate::error::{StoreError, StoreResult};
use crate::object::{StoredContent, WritePrecondition, WriteResult};
use crate::traits::ObjectAccessor;

/// A container described in a seed file.
#[derive(Clone, Debug, Deserialize)]
pub struct SeedContainer {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<SeedObject>,
}

/// An object described in a seed file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SeedObject {
    pub name: String,
    #[serde(default)]
    pub temporary_hold: bool,
    #[serde(default)]
    pub retention_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub content: String,
}

impl SeedObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn held(mut self) -> Self {
        self.temporary_hold = true;
        self
    }

    pub fn retained_until(mut self, expiry: DateTime<Utc>) -> Self {
        self.retention_expiry = Some(expiry);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    state: ObjectState,
}

#[derive(Default)]
struct StoreState {
    containers: HashMap<String, BTreeMap<String, StoredObject>>,
    next_generation: u64,
}

impl StoreState {
    fn bump_generation(&mut self) -> Generation {
        self.next_generation += 1;
        Generation::new(self.next_generation)
    }

    fn container(&self, container: &str) -> StoreResult<&BTreeMap<String, StoredObject>> {
        self.containers
            .get(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))
    }

    fn container_mut(
        &mut self,
        container: &str,
    ) -> StoreResult<&mut BTreeMap<String, StoredObject>> {
        self.containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))
    }
}

/// In-memory, `HashMap`-based object store.
///
/// Generations are drawn from one store-wide counter, so they are unique and
/// strictly increasing across all containers. The store can be switched
/// offline to simulate an unreachable backend.
pub struct InMemoryAccessor {
    inner: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
    online: AtomicBool,
}

impl InMemoryAccessor {
    /// Create an empty store using the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that timestamps and checks retention against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
            clock,
            online: AtomicBool::new(true),
        }
    }

    /// Build a store from a JSON seed: an array of [`SeedContainer`]s.
    pub fn from_seed_json(data: &[u8], clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let seed: Vec<SeedContainer> =
            serde_json::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let store = Self::with_clock(clock);
        for container in seed {
            store.create_container(&container.name)?;
            for object in container.objects {
                store.insert(&container.name, object)?;
            }
        }
        Ok(store)
    }

    /// Create a container. Existing containers are left untouched.
    pub fn create_container(&self, container: &str) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.containers.entry(container.to_string()).or_default();
        Ok(())
    }

    /// Place an object directly into the store, bypassing lock checks.
    ///
    /// Creates the container if needed. Used for seeding fixtures.
    pub fn insert(&self, container: &str, object: SeedObject) -> StoreResult<ObjectState> {
        let now = self.clock.now();
        let mut state = self.write_state()?;
        let generation = state.bump_generation();
        let object_state = ObjectState {
            name: object.name.clone(),
            temporary_hold: object.temporary_hold,
            retention_expiry: object.retention_expiry,
            metadata: object.metadata,
            updated_at: Some(now),
            version: ObjectVersion::new(generation, 1),
        };
        state
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                object.name,
                StoredObject {
                    data: Bytes::from(object.content),
                    state: object_state.clone(),
                },
            );
        Ok(object_state)
    }

    /// Take the store offline (every call fails with `Unavailable`) or back online.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of objects in `container`, including its ledger object.
    pub fn object_count(&self, container: &str) -> StoreResult<usize> {
        let state = self.read_state()?;
        Ok(state.container(container)?.len())
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.check_online()?;
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.check_online()?;
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("backend offline".into()))
        }
    }

    /// Apply a metadata-level patch to one object and return its new state.
    fn patch<F>(&self, container: &str, name: &str, apply: F) -> StoreResult<ObjectState>
    where
        F: FnOnce(&mut ObjectState, DateTime<Utc>) -> StoreResult<()>,
    {
        let now = self.clock.now();
        let mut state = self.write_state()?;
        let object = state
            .container_mut(container)?
            .get_mut(name)
            .ok_or_else(|| StoreError::ObjectNotFound {
                container: container.to_string(),
                name: name.to_string(),
            })?;
        apply(&mut object.state, now)?;
        object.state.version.metageneration += 1;
        object.state.updated_at = Some(now);
        Ok(object.state.clone())
    }
}

impl Default for InMemoryAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let containers = self
            .inner
            .read()
            .map(|state| state.containers.len())
            .unwrap_or_default();
        f.debug_struct("InMemoryAccessor")
            .field("containers", &containers)
            .field("online", &self.online.load(Ordering::SeqCst))
            .finish()
    }
}

fn lock_reason(state: &ObjectState, now: DateTime<Utc>) -> Option<String> {
    if state.temporary_hold {
        return Some("temporary hold is set".into());
    }
    match state.retention_expiry {
        Some(expiry) if expiry > now => Some(format!("retained until {}", expiry.to_rfc3339())),
        _ => None,
    }
}

impl ObjectAccessor for InMemoryAccessor {
    fn container_exists(&self, container: &str) -> StoreResult<bool> {
        let state = self.read_state()?;
        Ok(state.containers.contains_key(container))
    }

    fn get(&self, container: &str, name: &str) -> StoreResult<Option<ObjectState>> {
        let state = self.read_state()?;
        Ok(state
            .container(container)?
            .get(name)
            .map(|object| object.state.clone()))
    }

    fn list(&self, container: &str, prefix: Option<&str>) -> StoreResult<Vec<ObjectState>> {
        let state = self.read_state()?;
        let prefix = prefix.unwrap_or("");
        Ok(state
            .container(container)?
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, object)| object.state.clone())
            .collect())
    }

    fn read(&self, container: &str, name: &str) -> StoreResult<Option<StoredContent>> {
        let state = self.read_state()?;
        Ok(state.container(container)?.get(name).map(|object| StoredContent {
            data: object.data.clone(),
            state: object.state.clone(),
        }))
    }

    fn set_hold(&self, container: &str, name: &str, hold: bool) -> StoreResult<ObjectState> {
        self.patch(container, name, |state, _| {
            state.temporary_hold = hold;
            Ok(())
        })
    }

    fn set_retention(
        &self,
        container: &str,
        name: &str,
        expiry: DateTime<Utc>,
        override_unlocked: bool,
    ) -> StoreResult<ObjectState> {
        self.patch(container, name, |state, now| {
            let shortening = matches!(
                state.retention_expiry,
                Some(current) if current > now && expiry < current
            );
            if shortening && !override_unlocked {
                return Err(StoreError::RetentionOverrideRequired {
                    container: container.to_string(),
                    name: name.to_string(),
                });
            }
            state.retention_expiry = Some(expiry);
            Ok(())
        })
    }

    fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> StoreResult<ObjectState> {
        self.patch(container, name, |state, _| {
            state.metadata = metadata;
            Ok(())
        })
    }

    fn write(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> StoreResult<WriteResult> {
        let now = self.clock.now();
        let mut state = self.write_state()?;

        let current = state.container(container)?.get(name).map(|o| o.state.clone());
        let current_generation = current.as_ref().map(ObjectState::generation);
        let satisfied = match precondition {
            WritePrecondition::None => true,
            WritePrecondition::DoesNotExist => current.is_none(),
            WritePrecondition::MatchesGeneration(expected) => {
                current_generation == Some(expected)
            }
        };
        if !satisfied {
            tracing::debug!(container, name, ?precondition, "write precondition failed");
            return Ok(WriteResult::PreconditionFailed {
                current: current_generation,
            });
        }

        if let Some(reason) = current.as_ref().and_then(|s| lock_reason(s, now)) {
            return Err(StoreError::ObjectLocked {
                container: container.to_string(),
                name: name.to_string(),
                reason,
            });
        }

        let generation = state.bump_generation();
        let object_state = ObjectState::new(name, generation).with_updated_at(now);
        state.container_mut(container)?.insert(
            name.to_string(),
            StoredObject {
                data,
                state: object_state,
            },
        );
        Ok(WriteResult::Success { generation })
    }

    fn delete(&self, container: &str, name: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        let mut state = self.write_state()?;
        let objects = state.container_mut(container)?;
        if let Some(reason) = objects.get(name).and_then(|o| lock_reason(&o.state, now)) {
            return Err(StoreError::ObjectLocked {
                container: container.to_string(),
                name: name.to_string(),
                reason,
            });
        }
        Ok(objects.remove(name).is_some())
    }
}
