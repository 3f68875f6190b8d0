//! Committer-local time helpers.
//!
//! All scheduling decisions ("is it 8pm for this committer?", "what is
//! today's date for them?") go through these functions so the scheduler
//! and handlers agree on what a calendar day means.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Parse an IANA zone name, falling back to the given default when the
/// stored name is unrecognized.
#[must_use]
pub fn zone_or(tz_name: &str, fallback: Tz) -> Tz {
    tz_name.parse().unwrap_or(fallback)
}

/// The hour-of-day (0–23) at `now` in the given zone.
#[must_use]
pub fn local_hour(now: DateTime<Utc>, tz: Tz) -> u32 {
    now.with_timezone(&tz).hour()
}

/// The calendar date at `now` in the given zone.
#[must_use]
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}
