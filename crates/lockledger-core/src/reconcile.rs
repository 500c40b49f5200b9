//! The locked predicate.
//!
//! An object belongs in the ledger if and only if it carries a temporary
//! hold, or its retention expiry lies strictly after `now + grace`. An
//! absent expiry never counts as locked. The ledger is maintained lazily:
//! the predicate is re-evaluated for every object an operation touches and
//! for nothing else.

use chrono::{DateTime, Duration, Utc};
use lockledger_types::{LedgerEntries, LockEntry, ObjectState};

/// Outcome of reconciling one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// The object is locked; this is its fresh entry.
    Locked(LockEntry),
    /// The object is not locked; any existing entry must go.
    NotLocked,
}

impl Reconciled {
    pub fn is_locked(&self) -> bool {
        matches!(self, Reconciled::Locked(_))
    }

    /// Insert or remove `name` in `entries` to match this outcome.
    ///
    /// Returns `true` if `entries` changed.
    pub fn apply(self, name: &str, entries: &mut LedgerEntries) -> bool {
        match self {
            Reconciled::Locked(entry) => {
                let changed = entries.get(name) != Some(&entry);
                entries.insert(name.to_string(), entry);
                changed
            }
            Reconciled::NotLocked => entries.remove(name).is_some(),
        }
    }
}

/// Pure reconciliation of object state against the locked predicate.
#[derive(Clone, Copy, Debug)]
pub struct Reconciler {
    grace: Duration,
}

impl Reconciler {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Whether `state` counts as locked at `now`.
    pub fn is_locked(&self, state: &ObjectState, now: DateTime<Utc>) -> bool {
        state.temporary_hold || self.retention_outlives_grace(state.retention_expiry, now)
    }

    /// Whether a retention expiry lies strictly beyond `now + grace`.
    pub fn retention_outlives_grace(
        &self,
        expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match expiry {
            Some(expiry) => expiry > now + self.grace,
            None => false,
        }
    }

    /// Decide whether `state` belongs in the ledger and build its entry.
    pub fn reconcile(&self, state: &ObjectState, now: DateTime<Utc>) -> Reconciled {
        if self.is_locked(state, now) {
            Reconciled::Locked(LockEntry::from_state(state))
        } else {
            Reconciled::NotLocked
        }
    }
}
