use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use ingesta_core::Clock;

/// A [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("mutex poisoned") = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("mutex poisoned") += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("mutex poisoned")
    }
}
