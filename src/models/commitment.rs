//! Commitment model: one staked promise and its money state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How completion is verified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentType {
    /// Verified every day; a per-day penalty applies to each failure.
    Daily,
    /// Verified once on the deadline date; all-or-nothing.
    Deadline,
}

/// Lifecycle status for a commitment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    /// Payment confirmed; waiting for the judge to accept.
    AwaitingJudge,
    /// Judge declined; committer must restart with a different judge.
    JudgeDeclined,
    /// Judge accepted; verification is running.
    Active,
    /// Terminal: stake depleted, end date passed, or deadline resolved.
    Completed,
}

/// Outcome of the refund issued at termination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Refund requested, awaiting gateway confirmation.
    Pending,
    /// Refund confirmed by the gateway.
    Refunded,
    /// Nothing left to refund.
    NoRefund,
    /// Gateway call failed; flagged for manual follow-up.
    Failed,
}

/// One staked promise: terms, money, judge linkage, lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Commitment {
    /// Unique record identifier.
    pub id: String,
    /// Committer's normalized phone number.
    pub phone: String,
    /// Committer's display name, if given during setup.
    pub name: Option<String>,
    /// Free-form commitment text.
    pub commitment_text: String,
    /// Verification mode.
    pub commitment_type: CommitmentType,
    /// IANA timezone for local-hour scheduling.
    pub timezone: String,
    /// First day of the commitment (committer-local).
    pub start_date: NaiveDate,
    /// Last day of the commitment (committer-local).
    pub end_date: NaiveDate,
    /// Deadline date (deadline type only).
    pub deadline_date: Option<NaiveDate>,
    /// Stake paid at creation, in whole dollars. Fixed for life.
    pub original_stake: i64,
    /// Stake still held, in whole dollars. Never exceeds the original.
    pub stake_remaining: i64,
    /// Dollars debited per failed day (daily type). Deadline type
    /// treats the full stake as the single penalty.
    pub penalty_per_failure: i64,
    /// Judge's normalized phone number.
    pub judge_phone: String,
    /// Judge's display name.
    pub judge_name: String,
    /// Stripe payment intent, set once payment is confirmed.
    pub payment_intent_id: Option<String>,
    /// Current lifecycle status.
    pub status: CommitmentStatus,
    /// Refund outcome, populated at termination.
    pub refund_status: Option<RefundStatus>,
    /// Dollars refunded (or attempted).
    pub refund_amount: Option<i64>,
    /// Gateway error text when the refund failed.
    pub refund_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Commitment {
    /// Construct a new commitment in `AwaitingJudge`, as finalized by a
    /// confirmed payment.
    #[must_use]
    #[allow(clippy::too_many_arguments)] // Mirrors the staged setup fields one-to-one.
    pub fn new(
        phone: String,
        name: Option<String>,
        commitment_text: String,
        commitment_type: CommitmentType,
        timezone: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        deadline_date: Option<NaiveDate>,
        stake: i64,
        penalty_per_failure: i64,
        judge_phone: String,
        judge_name: String,
        payment_intent_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone,
            name,
            commitment_text,
            commitment_type,
            timezone,
            start_date,
            end_date,
            deadline_date,
            original_stake: stake,
            stake_remaining: stake,
            penalty_per_failure,
            judge_phone,
            judge_name,
            payment_intent_id: Some(payment_intent_id),
            status: CommitmentStatus::AwaitingJudge,
            refund_status: None,
            refund_amount: None,
            refund_error: None,
            created_at: Utc::now(),
        }
    }

    /// The penalty applied on a single failure: the configured per-day
    /// amount for daily commitments, the full remaining stake for
    /// deadline commitments.
    #[must_use]
    pub fn effective_penalty(&self) -> i64 {
        match self.commitment_type {
            CommitmentType::Daily => self.penalty_per_failure,
            CommitmentType::Deadline => self.stake_remaining,
        }
    }
}
