use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::TypeError;

/// Grace window, in seconds, applied to retention expiries.
///
/// A retention expiry counts as "still locked" only when it lies strictly
/// beyond `now + GRACE_WINDOW_SECS`; retentions about to lapse are treated as
/// already gone.
pub const GRACE_WINDOW_SECS: i64 = 30;

/// [`GRACE_WINDOW_SECS`] as a duration.
pub fn default_grace_window() -> Duration {
    Duration::seconds(GRACE_WINDOW_SECS)
}

/// Parse a user-supplied timestamp.
///
/// Accepts RFC 3339 (`2025-07-31T10:00:00Z`) or a bare date (`2025-07-31`),
/// which is read as midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TypeError> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TypeError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Source of the current time.
///
/// Everything that compares against "now" receives it from an injected
/// clock, so lock decisions are reproducible in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Set the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
