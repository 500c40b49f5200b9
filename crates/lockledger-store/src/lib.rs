//! Object state access for the Lock Ledger.
//!
//! This crate defines the boundary between the ledger and the remote object
//! store. The store is the ground truth for every object's hold flag,
//! retention expiry, and metadata; the ledger only caches it.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectAccessor`] trait:
//!
//! - [`InMemoryAccessor`] -- `HashMap`-based store for tests, demos, and embedding
//!
//! # Store Rules
//!
//! 1. Content writes and deletes are refused while an object carries a hold
//!    or an unexpired retention.
//! 2. Hold, retention, and metadata patches never change an object's
//!    content generation; they advance its metageneration.
//! 3. A content write assigns a fresh generation and a fresh, unlocked state.
//! 4. Conditional writes compare generations only.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryAccessor, SeedContainer, SeedObject};
pub use object::{StoredContent, WritePrecondition, WriteResult};
pub use traits::ObjectAccessor;
