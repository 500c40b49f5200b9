//! The Lock Ledger core.
//!
//! A container's ledger is one JSON object stored inside the container
//! itself, mapping the name of every locked object (temporary hold, or a
//! retention that outlives the grace window) to its cached lock state. This
//! crate provides:
//! - [`LedgerCodec`]: encoding of the entry map
//! - [`Reconciler`]: the pure "is this object locked?" decision
//! - [`LedgerStore`]: bootstrap, load, and compare-and-swap commit of the
//!   ledger object, wrapped in the hold release/reapply sequence
//! - [`BatchUpdater`]: applies a list of object edits and commits the
//!   resulting ledger once
//!
//! Concurrency is optimistic: writers never block each other, and a commit
//! whose expected version no longer matches fails with
//! [`LedgerError::Conflict`]. Nothing is retried internally.

pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchReport, BatchUpdater, ContainerBatch, ContainerOutcome, LockStatus, ObjectEdit};
pub use codec::{CodecError, LedgerCodec};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use reconcile::{Reconciled, Reconciler};
pub use store::{CommitReceipt, Ledger, LedgerStore, SingleEntryOutcome};
