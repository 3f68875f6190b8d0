//! Undo-window repository.
//!
//! Each judge verification records an entry here; UNDO within the window
//! consumes the most recent one and inverts its monetary delta. Entries
//! are single-use and swept once stale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::daily_log::LogOutcome;
use crate::{AppError, Result};

use super::db::Database;
use super::log_repo::outcome_str;

/// One undoable verification: what was applied and to whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Unique record identifier.
    pub id: String,
    /// Judge who performed the verification.
    pub judge_phone: String,
    /// Commitment the verification belongs to.
    pub commitment_id: String,
    /// Log the verification resolved.
    pub log_id: String,
    /// Outcome the verification applied (pass or fail).
    pub prior_outcome: LogOutcome,
    /// Dollars debited by the verification (0 for a pass).
    pub monetary_delta: i64,
    /// Creation timestamp; the undo window counts from here.
    pub created_at: DateTime<Utc>,
}

/// Repository wrapper around `SQLite` for undo entries.
#[derive(Clone)]
pub struct UndoRepo {
    db: Arc<Database>,
}

#[derive(sqlx::FromRow)]
struct UndoRow {
    id: String,
    judge_phone: String,
    commitment_id: String,
    log_id: String,
    prior_outcome: String,
    monetary_delta: i64,
    created_at: String,
}

impl UndoRow {
    fn into_entry(self) -> Result<UndoEntry> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);
        let prior_outcome = match self.prior_outcome.as_str() {
            "pass" => LogOutcome::Pass,
            "fail" => LogOutcome::Fail,
            other => return Err(AppError::Db(format!("invalid prior_outcome: {other}"))),
        };

        Ok(UndoEntry {
            id: self.id,
            judge_phone: self.judge_phone,
            commitment_id: self.commitment_id,
            log_id: self.log_id,
            prior_outcome,
            monetary_delta: self.monetary_delta,
            created_at,
        })
    }
}

impl UndoRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record an undoable verification.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn record(
        &self,
        judge_phone: &str,
        commitment_id: &str,
        log_id: &str,
        prior_outcome: LogOutcome,
        monetary_delta: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO undo_entry (id, judge_phone, commitment_id, log_id, prior_outcome,
             monetary_delta, consumed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(judge_phone)
        .bind(commitment_id)
        .bind(log_id)
        .bind(outcome_str(prior_outcome))
        .bind(monetary_delta)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// The judge's most recent unconsumed entry, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn latest(&self, judge_phone: &str) -> Result<Option<UndoEntry>> {
        let row: Option<UndoRow> = sqlx::query_as(
            "SELECT id, judge_phone, commitment_id, log_id, prior_outcome, monetary_delta,
             created_at FROM undo_entry
             WHERE judge_phone = ?1 AND consumed = 0
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(judge_phone)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(UndoRow::into_entry).transpose()
    }

    /// Consume an entry so it cannot be undone twice.
    ///
    /// Returns whether this call performed the consumption.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn consume(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE undo_entry SET consumed = 1 WHERE id = ?1 AND consumed = 0")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete entries older than the cutoff (expiry sweep).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<()> {
        sqlx::query("DELETE FROM undo_entry WHERE created_at < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }
}
