use bytes::Bytes;
use chrono::{DateTime, Utc};
use lockledger_types::ObjectState;
use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::object::{StoredContent, WritePrecondition, WriteResult};

/// Per-object access to a remote object store.
///
/// One accessor is constructed per process (credential and session handling
/// are its own concern) and shared by every ledger operation. Every call is
/// a blocking round trip.
///
/// All implementations must satisfy these invariants:
/// - Reads of a missing object return `Ok(None)`; mutations of a missing
///   object return [`StoreError::ObjectNotFound`](crate::StoreError::ObjectNotFound).
/// - Any operation on a missing container returns
///   [`StoreError::ContainerNotFound`](crate::StoreError::ContainerNotFound).
/// - Content writes and deletes of held or retained objects fail with
///   [`StoreError::ObjectLocked`](crate::StoreError::ObjectLocked).
/// - Preconditions are checked before the lock check.
pub trait ObjectAccessor: Send + Sync {
    /// Check whether a container exists.
    fn container_exists(&self, container: &str) -> StoreResult<bool>;

    /// Read an object's state.
    fn get(&self, container: &str, name: &str) -> StoreResult<Option<ObjectState>>;

    /// List objects, optionally restricted to names starting with `prefix`.
    ///
    /// Results are sorted by name.
    fn list(&self, container: &str, prefix: Option<&str>) -> StoreResult<Vec<ObjectState>>;

    /// Read an object's content and state.
    fn read(&self, container: &str, name: &str) -> StoreResult<Option<StoredContent>>;

    /// Set or clear an object's temporary hold.
    fn set_hold(&self, container: &str, name: &str, hold: bool) -> StoreResult<ObjectState>;

    /// Set an object's retention expiry.
    ///
    /// Shortening an unexpired retention requires `override_unlocked`.
    fn set_retention(
        &self,
        container: &str,
        name: &str,
        expiry: DateTime<Utc>,
        override_unlocked: bool,
    ) -> StoreResult<ObjectState>;

    /// Replace an object's metadata wholesale.
    fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: BTreeMap<String, String>,
    ) -> StoreResult<ObjectState>;

    /// Write an object's content, subject to `precondition`.
    fn write(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        precondition: WritePrecondition,
    ) -> StoreResult<WriteResult>;

    /// Delete an object. Returns `true` if the object existed.
    fn delete(&self, container: &str, name: &str) -> StoreResult<bool>;

    /// Check whether an object exists.
    fn exists(&self, container: &str, name: &str) -> StoreResult<bool> {
        Ok(self.get(container, name)?.is_some())
    }
}
