//! Foundation types for the Lock Ledger.
//!
//! The Lock Ledger is a cached side-index, kept inside an object-storage
//! container, of every object that currently carries a temporary hold or an
//! unexpired retention period. Every other `lockledger` crate depends on
//! `lockledger-types`.
//!
//! # Key Types
//!
//! - [`LockEntry`]: cached lock state of one locked object
//! - [`LedgerEntries`]: the ledger's name → entry mapping
//! - [`ObjectState`]: live snapshot of an object as reported by the store
//! - [`Generation`]: content version token, used for compare-and-swap
//! - [`ObjectVersion`]: content + metadata version, used for staleness checks
//! - [`Clock`]: injected source of "now"

pub mod entry;
pub mod error;
pub mod names;
pub mod object;
pub mod temporal;

pub use entry::{LedgerEntries, LockEntry};
pub use error::TypeError;
pub use names::{
    is_ledger_object, ledger_object_name, validate_container_name, validate_object_name,
    LEDGER_OBJECT_SUFFIX,
};
pub use object::{Generation, ObjectState, ObjectVersion};
pub use temporal::{
    default_grace_window, parse_timestamp, Clock, FixedClock, SystemClock, GRACE_WINDOW_SECS,
};
