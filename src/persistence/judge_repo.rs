//! Judge relationship repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::judge::{ConsentStatus, JudgeRecord};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for judge relationship records.
#[derive(Clone)]
pub struct JudgeRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct JudgeRow {
    id: String,
    phone: String,
    commitment_id: String,
    consent_status: String,
    created_at: String,
}

fn parse_consent(s: &str) -> Result<ConsentStatus> {
    match s {
        "pending" => Ok(ConsentStatus::Pending),
        "accepted" => Ok(ConsentStatus::Accepted),
        "declined" => Ok(ConsentStatus::Declined),
        other => Err(AppError::Db(format!("invalid consent_status: {other}"))),
    }
}

fn consent_str(s: ConsentStatus) -> &'static str {
    match s {
        ConsentStatus::Pending => "pending",
        ConsentStatus::Accepted => "accepted",
        ConsentStatus::Declined => "declined",
    }
}

impl JudgeRow {
    /// Convert a database row into the domain model.
    fn into_judge(self) -> Result<JudgeRecord> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);

        Ok(JudgeRecord {
            id: self.id,
            phone: self.phone,
            commitment_id: self.commitment_id,
            consent_status: parse_consent(&self.consent_status)?,
            created_at,
        })
    }
}

impl JudgeRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new judge relationship record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, judge: &JudgeRecord) -> Result<JudgeRecord> {
        sqlx::query(
            "INSERT INTO judge (id, phone, commitment_id, consent_status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&judge.id)
        .bind(&judge.phone)
        .bind(&judge.commitment_id)
        .bind(consent_str(judge.consent_status))
        .bind(judge.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(judge.clone())
    }

    /// List relationships for a judge phone in the given consent state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_phone(
        &self,
        phone: &str,
        consent: ConsentStatus,
    ) -> Result<Vec<JudgeRecord>> {
        let rows: Vec<JudgeRow> =
            sqlx::query_as("SELECT * FROM judge WHERE phone = ?1 AND consent_status = ?2")
                .bind(phone)
                .bind(consent_str(consent))
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(JudgeRow::into_judge).collect()
    }

    /// Retrieve the judge relationship for a commitment, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_commitment(&self, commitment_id: &str) -> Result<Option<JudgeRecord>> {
        let row: Option<JudgeRow> =
            sqlx::query_as("SELECT * FROM judge WHERE commitment_id = ?1 LIMIT 1")
                .bind(commitment_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(JudgeRow::into_judge).transpose()
    }

    /// Whether a judge phone already holds a pending or accepted
    /// relationship (double-booking guard).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn is_engaged(&self, phone: &str) -> Result<bool> {
        let row: Option<JudgeRow> = sqlx::query_as(
            "SELECT j.* FROM judge j
             JOIN commitment c ON c.id = j.commitment_id
             WHERE j.phone = ?1 AND j.consent_status IN ('pending', 'accepted')
             AND c.status IN ('awaiting_judge', 'active') LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(self.db.as_ref())
        .await?;

        Ok(row.is_some())
    }

    /// Record the judge's consent decision.
    ///
    /// Conditional on `pending` so a duplicate reply is a no-op.
    /// Returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_consent(&self, id: &str, consent: ConsentStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE judge SET consent_status = ?1 WHERE id = ?2 AND consent_status = 'pending'",
        )
        .bind(consent_str(consent))
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
