//! Judge model: the consent relationship between a judge phone and a
//! commitment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A judge's acceptance state for a specific commitment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    /// Consent request sent, no reply yet.
    Pending,
    /// Judge agreed to verify.
    Accepted,
    /// Judge declined.
    Declined,
}

/// One judge-to-commitment relationship. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct JudgeRecord {
    /// Unique record identifier.
    pub id: String,
    /// Judge's normalized phone number.
    pub phone: String,
    /// Commitment this relationship belongs to.
    pub commitment_id: String,
    /// Current consent state.
    pub consent_status: ConsentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl JudgeRecord {
    /// Construct a new pending judge relationship.
    #[must_use]
    pub fn new(phone: String, commitment_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone,
            commitment_id,
            consent_status: ConsentStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
