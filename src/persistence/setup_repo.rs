//! Setup session repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::models::commitment::CommitmentType;
use crate::models::setup::{SetupSession, SetupStep};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for setup session records.
#[derive(Clone)]
pub struct SetupRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SetupRow {
    phone: String,
    current_step: String,
    temp_name: Option<String>,
    temp_commitment: Option<String>,
    temp_commitment_type: Option<String>,
    temp_stake_amount: Option<i64>,
    temp_duration_days: Option<i64>,
    temp_deadline_date: Option<String>,
    temp_penalty: Option<i64>,
    temp_judge_phone: Option<String>,
    temp_judge_name: Option<String>,
    temp_timezone: String,
    payment_intent_id: Option<String>,
    updated_at: String,
}

fn parse_step(s: &str) -> Result<SetupStep> {
    match s {
        "awaiting_name" => Ok(SetupStep::AwaitingName),
        "awaiting_commitment" => Ok(SetupStep::AwaitingCommitment),
        "awaiting_commitment_type" => Ok(SetupStep::AwaitingCommitmentType),
        "awaiting_stake_amount" => Ok(SetupStep::AwaitingStakeAmount),
        "awaiting_duration" => Ok(SetupStep::AwaitingDuration),
        "awaiting_deadline_date" => Ok(SetupStep::AwaitingDeadlineDate),
        "awaiting_judge_phone" => Ok(SetupStep::AwaitingJudgePhone),
        "awaiting_payment" => Ok(SetupStep::AwaitingPayment),
        other => Err(AppError::Db(format!("invalid current_step: {other}"))),
    }
}

fn step_str(s: SetupStep) -> &'static str {
    match s {
        SetupStep::AwaitingName => "awaiting_name",
        SetupStep::AwaitingCommitment => "awaiting_commitment",
        SetupStep::AwaitingCommitmentType => "awaiting_commitment_type",
        SetupStep::AwaitingStakeAmount => "awaiting_stake_amount",
        SetupStep::AwaitingDuration => "awaiting_duration",
        SetupStep::AwaitingDeadlineDate => "awaiting_deadline_date",
        SetupStep::AwaitingJudgePhone => "awaiting_judge_phone",
        SetupStep::AwaitingPayment => "awaiting_payment",
    }
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

impl SetupRow {
    /// Convert a database row into the domain model.
    fn into_session(self) -> Result<SetupSession> {
        let updated_at = chrono::DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| AppError::Db(format!("invalid updated_at: {e}")))?
            .with_timezone(&Utc);

        Ok(SetupSession {
            phone: self.phone,
            current_step: parse_step(&self.current_step)?,
            temp_name: self.temp_name,
            temp_commitment: self.temp_commitment,
            temp_commitment_type: self
                .temp_commitment_type
                .as_deref()
                .map(parse_type)
                .transpose()?,
            temp_stake_amount: self.temp_stake_amount,
            temp_duration_days: self.temp_duration_days,
            temp_deadline_date: self
                .temp_deadline_date
                .as_deref()
                .map(|d| {
                    NaiveDate::parse_from_str(d, "%Y-%m-%d")
                        .map_err(|e| AppError::Db(format!("invalid temp_deadline_date: {e}")))
                })
                .transpose()?,
            temp_penalty: self.temp_penalty,
            temp_judge_phone: self.temp_judge_phone,
            temp_judge_name: self.temp_judge_name,
            temp_timezone: self.temp_timezone,
            payment_intent_id: self.payment_intent_id,
            updated_at,
        })
    }
}

impl SetupRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace the session for a phone (one session per phone).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn save(&self, session: &SetupSession) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO setup_session (phone, current_step, temp_name,
             temp_commitment, temp_commitment_type, temp_stake_amount, temp_duration_days,
             temp_deadline_date, temp_penalty, temp_judge_phone, temp_judge_name,
             temp_timezone, payment_intent_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&session.phone)
        .bind(step_str(session.current_step))
        .bind(&session.temp_name)
        .bind(&session.temp_commitment)
        .bind(session.temp_commitment_type.map(type_str))
        .bind(session.temp_stake_amount)
        .bind(session.temp_duration_days)
        .bind(
            session
                .temp_deadline_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
        )
        .bind(session.temp_penalty)
        .bind(&session.temp_judge_phone)
        .bind(&session.temp_judge_name)
        .bind(&session.temp_timezone)
        .bind(&session.payment_intent_id)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Retrieve the session for a phone, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, phone: &str) -> Result<Option<SetupSession>> {
        let row: Option<SetupRow> = sqlx::query_as("SELECT * FROM setup_session WHERE phone = ?1")
            .bind(phone)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(SetupRow::into_session).transpose()
    }

    /// Retrieve the session that created a payment intent, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_intent(&self, intent_id: &str) -> Result<Option<SetupSession>> {
        let row: Option<SetupRow> =
            sqlx::query_as("SELECT * FROM setup_session WHERE payment_intent_id = ?1")
                .bind(intent_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(SetupRow::into_session).transpose()
    }

    /// Delete the session for a phone (finalization or RESET).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, phone: &str) -> Result<()> {
        sqlx::query("DELETE FROM setup_session WHERE phone = ?1")
            .bind(phone)
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }
}
