//! Daily log model: one verification event for a single calendar day
//! (or the single deadline date).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verification outcome for one day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    /// Awaiting the judge's verdict.
    Pending,
    /// Judge confirmed completion.
    Pass,
    /// Judge reported failure (or the timeout default applied).
    Fail,
}

/// One day's verification record. At most one per (commitment, date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DailyLog {
    /// Unique record identifier.
    pub id: String,
    /// Owning commitment.
    pub commitment_id: String,
    /// Calendar date in the committer's local timezone.
    pub date: NaiveDate,
    /// Current outcome.
    pub outcome: LogOutcome,
    /// Whether a judge (rather than a timeout default) resolved it.
    pub judge_verified: Option<bool>,
    /// Escalation progress: 0 none, 1 first reminder sent, 2 second.
    pub reminder_stage: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the outcome left `Pending`.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DailyLog {
    /// Construct a new pending log for a commitment-day.
    #[must_use]
    pub fn new(commitment_id: String, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            commitment_id,
            date,
            outcome: LogOutcome::Pending,
            judge_verified: None,
            reminder_stage: 0,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}
