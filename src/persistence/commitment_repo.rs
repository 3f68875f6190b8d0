//! Commitment repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::models::commitment::{Commitment, CommitmentStatus, CommitmentType, RefundStatus};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for commitment records.
#[derive(Clone)]
pub struct CommitmentRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct CommitmentRow {
    id: String,
    phone: String,
    name: Option<String>,
    commitment_text: String,
    commitment_type: String,
    timezone: String,
    start_date: String,
    end_date: String,
    deadline_date: Option<String>,
    original_stake: i64,
    stake_remaining: i64,
    penalty_per_failure: i64,
    judge_phone: String,
    judge_name: String,
    payment_intent_id: Option<String>,
    status: String,
    refund_status: Option<String>,
    refund_amount: Option<i64>,
    refund_error: Option<String>,
    created_at: String,
}

fn parse_date(s: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

fn parse_type(s: &str) -> Result<CommitmentType> {
    match s {
        "daily" => Ok(CommitmentType::Daily),
        "deadline" => Ok(CommitmentType::Deadline),
        other => Err(AppError::Db(format!("invalid commitment_type: {other}"))),
    }
}

fn type_str(t: CommitmentType) -> &'static str {
    match t {
        CommitmentType::Daily => "daily",
        CommitmentType::Deadline => "deadline",
    }
}

fn parse_status(s: &str) -> Result<CommitmentStatus> {
    match s {
        "awaiting_judge" => Ok(CommitmentStatus::AwaitingJudge),
        "judge_declined" => Ok(CommitmentStatus::JudgeDeclined),
        "active" => Ok(CommitmentStatus::Active),
        "completed" => Ok(CommitmentStatus::Completed),
        other => Err(AppError::Db(format!("invalid commitment status: {other}"))),
    }
}

fn status_str(s: CommitmentStatus) -> &'static str {
    match s {
        CommitmentStatus::AwaitingJudge => "awaiting_judge",
        CommitmentStatus::JudgeDeclined => "judge_declined",
        CommitmentStatus::Active => "active",
        CommitmentStatus::Completed => "completed",
    }
}

fn parse_refund_status(s: &str) -> Result<RefundStatus> {
    match s {
        "pending" => Ok(RefundStatus::Pending),
        "refunded" => Ok(RefundStatus::Refunded),
        "no_refund" => Ok(RefundStatus::NoRefund),
        "failed" => Ok(RefundStatus::Failed),
        other => Err(AppError::Db(format!("invalid refund_status: {other}"))),
    }
}

fn refund_status_str(s: RefundStatus) -> &'static str {
    match s {
        RefundStatus::Pending => "pending",
        RefundStatus::Refunded => "refunded",
        RefundStatus::NoRefund => "no_refund",
        RefundStatus::Failed => "failed",
    }
}

impl CommitmentRow {
    /// Convert a database row into the domain model.
    fn into_commitment(self) -> Result<Commitment> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);

        Ok(Commitment {
            id: self.id,
            phone: self.phone,
            name: self.name,
            commitment_text: self.commitment_text,
            commitment_type: parse_type(&self.commitment_type)?,
            timezone: self.timezone,
            start_date: parse_date(&self.start_date, "start_date")?,
            end_date: parse_date(&self.end_date, "end_date")?,
            deadline_date: self
                .deadline_date
                .as_deref()
                .map(|d| parse_date(d, "deadline_date"))
                .transpose()?,
            original_stake: self.original_stake,
            stake_remaining: self.stake_remaining,
            penalty_per_failure: self.penalty_per_failure,
            judge_phone: self.judge_phone,
            judge_name: self.judge_name,
            payment_intent_id: self.payment_intent_id,
            status: parse_status(&self.status)?,
            refund_status: self
                .refund_status
                .as_deref()
                .map(parse_refund_status)
                .transpose()?,
            refund_amount: self.refund_amount,
            refund_error: self.refund_error,
            created_at,
        })
    }
}

impl CommitmentRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new commitment record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, commitment: &Commitment) -> Result<Commitment> {
        sqlx::query(
            "INSERT INTO commitment (id, phone, name, commitment_text, commitment_type,
             timezone, start_date, end_date, deadline_date, original_stake, stake_remaining,
             penalty_per_failure, judge_phone, judge_name, payment_intent_id, status,
             refund_status, refund_amount, refund_error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20)",
        )
        .bind(&commitment.id)
        .bind(&commitment.phone)
        .bind(&commitment.name)
        .bind(&commitment.commitment_text)
        .bind(type_str(commitment.commitment_type))
        .bind(&commitment.timezone)
        .bind(commitment.start_date.format("%Y-%m-%d").to_string())
        .bind(commitment.end_date.format("%Y-%m-%d").to_string())
        .bind(
            commitment
                .deadline_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
        )
        .bind(commitment.original_stake)
        .bind(commitment.stake_remaining)
        .bind(commitment.penalty_per_failure)
        .bind(&commitment.judge_phone)
        .bind(&commitment.judge_name)
        .bind(&commitment.payment_intent_id)
        .bind(status_str(commitment.status))
        .bind(commitment.refund_status.map(refund_status_str))
        .bind(commitment.refund_amount)
        .bind(&commitment.refund_error)
        .bind(commitment.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(commitment.clone())
    }

    /// Retrieve a commitment by identifier.
    ///
    /// Returns `Ok(None)` if the commitment does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Commitment>> {
        let row: Option<CommitmentRow> = sqlx::query_as("SELECT * FROM commitment WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(CommitmentRow::into_commitment).transpose()
    }

    /// Retrieve the active commitment for a phone, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_active_by_phone(&self, phone: &str) -> Result<Option<Commitment>> {
        let row: Option<CommitmentRow> = sqlx::query_as(
            "SELECT * FROM commitment WHERE phone = ?1 AND status = 'active' LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(CommitmentRow::into_commitment).transpose()
    }

    /// Retrieve the awaiting-judge or active commitment for a phone.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_open_by_phone(&self, phone: &str) -> Result<Option<Commitment>> {
        let row: Option<CommitmentRow> = sqlx::query_as(
            "SELECT * FROM commitment WHERE phone = ?1
             AND status IN ('awaiting_judge', 'active') LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(CommitmentRow::into_commitment).transpose()
    }

    /// Retrieve the commitment funded by a payment intent, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_intent(&self, intent_id: &str) -> Result<Option<Commitment>> {
        let row: Option<CommitmentRow> =
            sqlx::query_as("SELECT * FROM commitment WHERE payment_intent_id = ?1 LIMIT 1")
                .bind(intent_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(CommitmentRow::into_commitment).transpose()
    }

    /// List all active commitments (scheduler scan).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Commitment>> {
        let rows: Vec<CommitmentRow> =
            sqlx::query_as("SELECT * FROM commitment WHERE status = 'active'")
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter()
            .map(CommitmentRow::into_commitment)
            .collect()
    }

    /// List completed commitments for a phone, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_completed_by_phone(
        &self,
        phone: &str,
        limit: i64,
    ) -> Result<Vec<Commitment>> {
        let rows: Vec<CommitmentRow> = sqlx::query_as(
            "SELECT * FROM commitment WHERE phone = ?1 AND status = 'completed'
             ORDER BY end_date DESC LIMIT ?2",
        )
        .bind(phone)
        .bind(limit)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(CommitmentRow::into_commitment)
            .collect()
    }

    /// Transition an awaiting-judge commitment to active.
    ///
    /// Conditional on the current status so a duplicate consent reply is
    /// a no-op. Returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn activate(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE commitment SET status = 'active' WHERE id = ?1 AND status = 'awaiting_judge'",
        )
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition an awaiting-judge commitment to judge-declined.
    ///
    /// Returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn mark_declined(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE commitment SET status = 'judge_declined'
             WHERE id = ?1 AND status = 'awaiting_judge'",
        )
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transition a commitment to completed.
    ///
    /// Conditional on not already being completed, so a judge reply
    /// racing the termination sweep terminates exactly once. Returns
    /// whether this call performed the transition.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn complete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE commitment SET status = 'completed'
             WHERE id = ?1 AND status IN ('active', 'awaiting_judge')",
        )
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the remaining stake to an absolute value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_stake_remaining(&self, id: &str, remaining: i64) -> Result<()> {
        sqlx::query("UPDATE commitment SET stake_remaining = ?1 WHERE id = ?2")
            .bind(remaining)
            .bind(id)
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }

    /// Apply a signed delta to the remaining stake, clamped into
    /// `[0, original_stake]` (undo and admin corrections).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn adjust_stake(&self, id: &str, delta: i64) -> Result<()> {
        sqlx::query(
            "UPDATE commitment SET stake_remaining =
             MIN(original_stake, MAX(0, stake_remaining + ?1)) WHERE id = ?2",
        )
        .bind(delta)
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Record the refund outcome for a commitment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_refund(
        &self,
        id: &str,
        status: RefundStatus,
        amount: i64,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE commitment SET refund_status = ?1, refund_amount = ?2, refund_error = ?3
             WHERE id = ?4",
        )
        .bind(refund_status_str(status))
        .bind(amount)
        .bind(error)
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// List completed commitments holding nonzero stake with no
    /// successful refund, for the daily operator report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_unrefunded(&self) -> Result<Vec<Commitment>> {
        let rows: Vec<CommitmentRow> = sqlx::query_as(
            "SELECT * FROM commitment WHERE status = 'completed' AND stake_remaining > 0
             AND (refund_status IS NULL OR refund_status NOT IN ('refunded', 'no_refund'))",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(CommitmentRow::into_commitment)
            .collect()
    }
}
