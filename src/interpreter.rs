//! Loose-text interpretation fallback.
//!
//! When the strict slot parsers reject a reply, the dialogue (or a
//! judge's verification handler) hands the raw text to an
//! [`Interpreter`] scoped to the slot being filled. Interpretation
//! never applies to names, commitment text, or phone numbers; those are
//! taken verbatim or strictly parsed.

use chrono::{Days, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::parse::slots;

/// Which slot the dialogue is trying to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    /// A dollar amount.
    Amount,
    /// A duration in days.
    DurationDays,
    /// A future calendar date.
    Date,
    /// A pass/fail verdict.
    YesNo,
}

/// A value extracted from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotValue {
    /// Whole dollars.
    Amount(i64),
    /// Day count.
    DurationDays(i64),
    /// Calendar date.
    Date(NaiveDate),
    /// Verdict; `true` is a pass.
    YesNo(bool),
}

/// Extracts a typed slot value from free text, or declines.
pub trait Interpreter: Send + Sync {
    /// Try to read `slot` out of `text`. `today` anchors relative dates
    /// in the committer's zone.
    fn interpret(&self, text: &str, slot: SlotType, today: NaiveDate) -> Option<SlotValue>;
}

// Patterns are compile-time constants.
#[allow(clippy::unwrap_used)]
static EMBEDDED_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)|(\d+)\s*(?:dollars|bucks)").unwrap());

#[allow(clippy::unwrap_used)]
static EMBEDDED_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(a|an|\d+|[a-z]+)\s+(day|week|month)s?\b").unwrap());

/// Pattern-based interpreter.
///
/// Scans for the slot's shape anywhere in the message instead of
/// requiring the whole reply to match, so "let's say $25" or "make it
/// three weeks" still land.
#[derive(Debug, Default)]
pub struct RuleInterpreter;

impl RuleInterpreter {
    fn amount(text: &str) -> Option<i64> {
        let cleaned = text.to_lowercase();
        let caps = EMBEDDED_AMOUNT_RE.captures(&cleaned)?;
        let digits = caps.get(1).or_else(|| caps.get(2))?;
        digits.as_str().parse().ok()
    }

    fn spelled_amount(text: &str) -> Option<i64> {
        let cleaned = text.to_lowercase();
        for word in cleaned.split_whitespace() {
            let value = match word {
                "five" => 5,
                "ten" => 10,
                "twenty" => 20,
                "thirty" => 30,
                "forty" => 40,
                "fifty" => 50,
                "hundred" => 100,
                _ => continue,
            };
            if cleaned.contains("dollar") || cleaned.contains("buck") {
                return Some(value);
            }
        }
        None
    }

    fn duration(text: &str) -> Option<i64> {
        let cleaned = text.to_lowercase();
        let caps = EMBEDDED_DURATION_RE.captures(&cleaned)?;
        let count_token = caps.get(1)?.as_str();
        let count = if count_token == "a" || count_token == "an" {
            1
        } else {
            count_token
                .parse()
                .ok()
                .or_else(|| slots::word_number(count_token))?
        };
        let per_unit = match caps.get(2)?.as_str() {
            "day" => 1,
            "week" => 7,
            "month" => 30,
            _ => return None,
        };
        Some(count * per_unit)
    }

    fn yes_no(text: &str) -> Option<bool> {
        let cleaned = text.to_lowercase();
        let words: Vec<&str> = cleaned
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();
        // Negations first, so "nope, they didn't" never reads as a pass.
        let negative = words.iter().any(|w| {
            matches!(
                *w,
                "no" | "nope" | "nah" | "didn't" | "didnt" | "failed" | "missed" | "skipped"
            )
        }) || cleaned.contains("did not")
            || cleaned.contains("not done");
        if negative {
            return Some(false);
        }
        let positive = words.iter().any(|w| {
            matches!(
                *w,
                "yes" | "yep" | "yeah" | "yup" | "sure" | "done" | "totally" | "definitely"
            )
        }) || cleaned.contains("did it")
            || cleaned.contains("they did");
        positive.then_some(true)
    }

    fn date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
        let cleaned = text.to_lowercase();
        if cleaned.contains("tomorrow") {
            return today.checked_add_days(Days::new(1));
        }
        // Scan word windows for the strict date shapes, so "by March 3"
        // or "how about next friday" resolve.
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        for width in (1..=3).rev() {
            for window in words.windows(width) {
                let phrase = window.join(" ");
                if let Some(date) = slots::parse_deadline_date(&phrase, today) {
                    return Some(date);
                }
            }
        }
        None
    }
}

impl Interpreter for RuleInterpreter {
    fn interpret(&self, text: &str, slot: SlotType, today: NaiveDate) -> Option<SlotValue> {
        match slot {
            SlotType::Amount => Self::amount(text)
                .or_else(|| Self::spelled_amount(text))
                .map(SlotValue::Amount),
            SlotType::DurationDays => Self::duration(text).map(SlotValue::DurationDays),
            SlotType::Date => Self::date(text, today).map(SlotValue::Date),
            SlotType::YesNo => Self::yes_no(text).map(SlotValue::YesNo),
        }
    }
}
