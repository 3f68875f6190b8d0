//! Payout repository for `SQLite` persistence. Append-only.

use std::sync::Arc;

use chrono::Utc;

use crate::models::payout::Payout;
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for payout records.
#[derive(Clone)]
pub struct PayoutRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct PayoutRow {
    id: String,
    commitment_id: String,
    judge_phone: String,
    amount: i64,
    reason: String,
    created_at: String,
}

impl PayoutRow {
    /// Convert a database row into the domain model.
    fn into_payout(self) -> Result<Payout> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);

        Ok(Payout {
            id: self.id,
            commitment_id: self.commitment_id,
            judge_phone: self.judge_phone,
            amount: self.amount,
            reason: self.reason,
            created_at,
        })
    }
}

impl PayoutRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a payout entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, payout: &Payout) -> Result<Payout> {
        sqlx::query(
            "INSERT INTO payout (id, commitment_id, judge_phone, amount, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&payout.id)
        .bind(&payout.commitment_id)
        .bind(&payout.judge_phone)
        .bind(payout.amount)
        .bind(&payout.reason)
        .bind(payout.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(payout.clone())
    }

    /// List payouts for a commitment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_commitment(&self, commitment_id: &str) -> Result<Vec<Payout>> {
        let rows: Vec<PayoutRow> = sqlx::query_as(
            "SELECT * FROM payout WHERE commitment_id = ?1 ORDER BY created_at ASC",
        )
        .bind(commitment_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(PayoutRow::into_payout).collect()
    }
}
