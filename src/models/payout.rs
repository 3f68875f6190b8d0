//! Payout model: append-only ledger entry recording each penalty event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One penalty event, for audit and admin reporting. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Payout {
    /// Unique record identifier.
    pub id: String,
    /// Commitment the penalty was applied to.
    pub commitment_id: String,
    /// Judge who earns the penalty amount.
    pub judge_phone: String,
    /// Dollars debited.
    pub amount: i64,
    /// Human-readable reason ("failure on 2026-08-23", corrections, …).
    pub reason: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Payout {
    /// Construct a new payout entry.
    #[must_use]
    pub fn new(commitment_id: String, judge_phone: String, amount: i64, reason: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            commitment_id,
            judge_phone,
            amount,
            reason,
            created_at: Utc::now(),
        }
    }
}
