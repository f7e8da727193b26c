//! Injectable clock abstraction
//!
//! Expiry checks read time through [`Clock`] so tests can produce expired
//! and valid tokens deterministically.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Source of the current time for validity checks.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock fixed to an explicit instant, settable at any point.
///
/// Intended for tests; advancing it past a token's `exp` makes the token
/// expired without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock pinned to `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Moves the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    /// Advances the clock by `seconds`.
    pub fn advance_secs(&self, seconds: i64) {
        let mut guard = self.now.write();
        *guard += chrono::Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
