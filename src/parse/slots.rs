//! Strict slot parsers for the setup dialogue.
//!
//! Each parser accepts the unambiguous forms only; anything looser falls
//! through to the interpreter. Range validation happens here so the
//! dialogue can re-prompt with the exact constraint that failed.

use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use regex::Regex;

use crate::models::commitment::CommitmentType;

/// Inclusive stake bounds in whole dollars.
pub const STAKE_MIN: i64 = 5;
/// Inclusive stake bounds in whole dollars.
pub const STAKE_MAX: i64 = 500;
/// Inclusive duration bounds in days.
pub const DURATION_MIN: i64 = 1;
/// Inclusive duration bounds in days.
pub const DURATION_MAX: i64 = 90;

// Patterns are compile-time constants.
#[allow(clippy::unwrap_used)]
static STAKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?(\d+)(?:\s*(?:dollars|bucks))?$").unwrap());

#[allow(clippy::unwrap_used)]
static COUNT_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(a|an|\d+|[a-z]+)\s+(day|week|month)s?$").unwrap());

#[allow(clippy::unwrap_used)]
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})$").unwrap());

#[allow(clippy::unwrap_used)]
static NAMED_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?$").unwrap());

/// Spelled-out numbers accepted in duration and date expressions.
#[must_use]
pub fn word_number(word: &str) -> Option<i64> {
    match word {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        "eleven" => Some(11),
        "twelve" => Some(12),
        _ => None,
    }
}

/// Strict stake parse: `20`, `$20`, `20 dollars`, `$20 bucks`.
///
/// Returns the literal amount; the caller enforces [`STAKE_MIN`]..=[`STAKE_MAX`].
#[must_use]
pub fn parse_stake_amount(text: &str) -> Option<i64> {
    let cleaned = text.trim().to_lowercase();
    let caps = STAKE_RE.captures(&cleaned)?;
    caps.get(1)?.as_str().parse().ok()
}

fn parse_count(token: &str) -> Option<i64> {
    if token == "a" || token == "an" {
        return Some(1);
    }
    token.parse().ok().or_else(|| word_number(token))
}

/// A `N days|weeks|months` expression (spelled-out numbers included),
/// converted to days. One week is 7 days, one month 30.
#[must_use]
pub fn count_unit_days(text: &str) -> Option<i64> {
    let cleaned = text.trim().to_lowercase();
    let caps = COUNT_UNIT_RE.captures(&cleaned)?;
    let count = parse_count(caps.get(1)?.as_str())?;
    let per_unit = match caps.get(2)?.as_str() {
        "day" => 1,
        "week" => 7,
        "month" => 30,
        _ => return None,
    };
    Some(count * per_unit)
}

/// Strict duration parse for daily commitments: a bare day count or a
/// `N days|weeks|months` expression.
///
/// Returns the literal day count; the caller enforces
/// [`DURATION_MIN`]..=[`DURATION_MAX`].
#[must_use]
pub fn parse_duration_days(text: &str) -> Option<i64> {
    let cleaned = text.trim().to_lowercase();
    if let Ok(days) = cleaned.parse::<i64>() {
        return Some(days);
    }
    count_unit_days(&cleaned)
}

/// Strict commitment-type parse: `daily`/`1` or `deadline`/`2`.
#[must_use]
pub fn parse_commitment_type(text: &str) -> Option<CommitmentType> {
    match text.trim().to_lowercase().as_str() {
        "daily" | "1" => Some(CommitmentType::Daily),
        "deadline" | "2" => Some(CommitmentType::Deadline),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?;
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let prefix = name.get(..3)?;
    let weekday = match prefix {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Roll a month/day to the first occurrence strictly after `today`.
fn upcoming_month_day(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if date > today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// The next occurrence of `weekday` strictly after `today`.
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + i64::from(weekday.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday()))
        % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Days::new(ahead.unsigned_abs())
}

/// Strict deadline-date parse.
///
/// Accepts `MM/DD` (rolling to next year when past), `Mon DD`,
/// `next <weekday>`, and `N days|weeks|months` offsets. Returns dates
/// strictly after `today`; anything else is `None`.
#[must_use]
pub fn parse_deadline_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = text.trim().to_lowercase();

    let candidate = if let Some(caps) = SLASH_DATE_RE.captures(&cleaned) {
        let month: u32 = caps.get(1)?.as_str().parse().ok()?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        upcoming_month_day(today, month, day)
    } else if let Some(rest) = cleaned.strip_prefix("next ") {
        weekday_from_name(rest.trim()).map(|wd| next_weekday(today, wd))
    } else if let Some(caps) = NAMED_DATE_RE.captures(&cleaned) {
        let month = month_from_name(caps.get(1)?.as_str());
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        month.and_then(|m| upcoming_month_day(today, m, day))
    } else if let Some(days) = count_unit_days(&cleaned) {
        if days >= 28 && days % 30 == 0 {
            // Month offsets use calendar months, not a flat 30 days.
            let months = u32::try_from(days / 30).ok()?;
            if cleaned.contains("month") {
                today.checked_add_months(Months::new(months))
            } else {
                today.checked_add_days(Days::new(days.unsigned_abs()))
            }
        } else {
            today.checked_add_days(Days::new(days.unsigned_abs()))
        }
    } else {
        None
    };

    candidate.filter(|date| *date > today)
}

/// Strict judge-contact parse: a display name followed by a phone
/// number, e.g. `Sarah 555-123-4567`.
///
/// Returns `(name, normalized_phone)` when the name is non-empty and the
/// number carries at least ten digits. The caller rejects the
/// committer's own number and double-booked judges.
#[must_use]
pub fn parse_judge_contact(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    let digit_start = trimmed
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit() || *c == '+' || *c == '(')
        .map(|(i, _)| i)?;

    let name = trimmed[..digit_start]
        .trim_end_matches([' ', ',', ':', '-'])
        .trim();
    if name.is_empty() {
        return None;
    }

    let phone = super::phone::normalize_phone(&trimmed[digit_start..]);
    if !super::phone::is_plausible_phone(&phone) {
        return None;
    }

    Some((name.to_owned(), phone))
}
