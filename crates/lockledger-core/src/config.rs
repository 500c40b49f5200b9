use chrono::Duration;
use lockledger_types::default_grace_window;

/// Configuration for ledger operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Retention expiries within this window of "now" count as lapsed, and
    /// lock edits without a usable expiry retain the object for this long.
    pub grace_window: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            grace_window: default_grace_window(),
        }
    }
}

impl LedgerConfig {
    pub fn with_grace_window(grace_window: Duration) -> Self {
        Self { grace_window }
    }
}
