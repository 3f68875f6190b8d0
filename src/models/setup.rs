//! Setup session model: ephemeral per-phone dialogue state used only
//! while a commitment is being created.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::commitment::CommitmentType;

/// Position in the linear setup dialogue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    /// Asking for the committer's display name.
    AwaitingName,
    /// Asking for the commitment text.
    AwaitingCommitment,
    /// Asking daily vs. deadline.
    AwaitingCommitmentType,
    /// Asking for the stake amount.
    AwaitingStakeAmount,
    /// Asking how many days (daily type).
    AwaitingDuration,
    /// Asking for the deadline date (deadline type).
    AwaitingDeadlineDate,
    /// Asking for the judge's name and phone.
    AwaitingJudgePhone,
    /// Payment link sent; waiting for the Stripe webhook.
    AwaitingPayment,
}

/// Staged dialogue state for one phone number. Deleted on finalization,
/// cancellation, or when superseded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SetupSession {
    /// Committer's normalized phone number (primary key).
    pub phone: String,
    /// Current dialogue position.
    pub current_step: SetupStep,
    /// Staged display name.
    pub temp_name: Option<String>,
    /// Staged commitment text.
    pub temp_commitment: Option<String>,
    /// Staged verification mode.
    pub temp_commitment_type: Option<CommitmentType>,
    /// Staged stake in whole dollars.
    pub temp_stake_amount: Option<i64>,
    /// Staged duration in days (daily type).
    pub temp_duration_days: Option<i64>,
    /// Staged deadline date (deadline type).
    pub temp_deadline_date: Option<NaiveDate>,
    /// Staged per-failure penalty in whole dollars.
    pub temp_penalty: Option<i64>,
    /// Staged judge phone.
    pub temp_judge_phone: Option<String>,
    /// Staged judge display name.
    pub temp_judge_name: Option<String>,
    /// Committer's IANA timezone.
    pub temp_timezone: String,
    /// Payment intent created when the dialogue reached payment.
    pub payment_intent_id: Option<String>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SetupSession {
    /// Start a fresh session at the first step.
    #[must_use]
    pub fn start(phone: String, timezone: String) -> Self {
        Self {
            phone,
            current_step: SetupStep::AwaitingName,
            temp_name: None,
            temp_commitment: None,
            temp_commitment_type: None,
            temp_stake_amount: None,
            temp_duration_days: None,
            temp_deadline_date: None,
            temp_penalty: None,
            temp_judge_phone: None,
            temp_judge_name: None,
            temp_timezone: timezone,
            payment_intent_id: None,
            updated_at: Utc::now(),
        }
    }
}
