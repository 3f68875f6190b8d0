//! In-process sliding-window counter with expiry.
//!
//! Backs the signup rate limit: counts events per key within a window,
//! dropping entries as they age out. State is process-local and lost on
//! restart, which is acceptable for abuse throttling.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Sliding-window event counter keyed by an arbitrary string (an IP
/// address, in practice).
#[derive(Debug)]
pub struct ExpiringCounter {
    window: Duration,
    events: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl ExpiringCounter {
    /// A counter whose events expire after `window_minutes`.
    #[must_use]
    pub fn new(window_minutes: i64) -> Self {
        Self {
            window: Duration::minutes(window_minutes),
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Record an event for `key` at `now` and return the number of
    /// events still inside the window, including this one.
    ///
    /// Expired entries for the key are dropped on the way; a periodic
    /// [`sweep`](Self::sweep) clears keys that stop arriving entirely.
    pub fn record(&self, key: &str, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let timestamps = events.entry(key.to_owned()).or_default();
        timestamps.retain(|t| *t > cutoff);
        timestamps.push(now);
        timestamps.len()
    }

    /// Drop every key whose events have all aged out.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.retain(|_, timestamps| {
            timestamps.retain(|t| *t > cutoff);
            !timestamps.is_empty()
        });
    }
}
