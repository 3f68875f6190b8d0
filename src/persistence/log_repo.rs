//! Daily log repository for `SQLite` persistence.
//!
//! Every resolution path goes through a conditional update scoped by
//! `outcome = 'pending'`, so a judge reply racing a timeout sweep (or a
//! redelivered webhook) can only resolve a log once.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::models::daily_log::{DailyLog, LogOutcome};
use crate::{AppError, Result};

use super::db::Database;

/// Repository wrapper around `SQLite` for daily log records.
#[derive(Clone)]
pub struct LogRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    commitment_id: String,
    date: String,
    outcome: String,
    judge_verified: Option<bool>,
    reminder_stage: i64,
    created_at: String,
    resolved_at: Option<String>,
}

fn parse_outcome(s: &str) -> Result<LogOutcome> {
    match s {
        "pending" => Ok(LogOutcome::Pending),
        "pass" => Ok(LogOutcome::Pass),
        "fail" => Ok(LogOutcome::Fail),
        other => Err(AppError::Db(format!("invalid outcome: {other}"))),
    }
}

/// Map an outcome to its stored string form.
#[must_use]
pub fn outcome_str(o: LogOutcome) -> &'static str {
    match o {
        LogOutcome::Pending => "pending",
        LogOutcome::Pass => "pass",
        LogOutcome::Fail => "fail",
    }
}

impl LogRow {
    /// Convert a database row into the domain model.
    fn into_log(self) -> Result<DailyLog> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| AppError::Db(format!("invalid created_at: {e}")))?
            .with_timezone(&Utc);
        let resolved_at = self
            .resolved_at
            .as_deref()
            .map(|s| {
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| AppError::Db(format!("invalid resolved_at: {e}")))
            })
            .transpose()?;

        Ok(DailyLog {
            id: self.id,
            commitment_id: self.commitment_id,
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
                .map_err(|e| AppError::Db(format!("invalid date: {e}")))?,
            outcome: parse_outcome(&self.outcome)?,
            judge_verified: self.judge_verified,
            reminder_stage: self.reminder_stage,
            created_at,
            resolved_at,
        })
    }
}

impl LogRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new log record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if a log already exists for the
    /// (commitment, date) pair, or `AppError::Db` on other failures.
    pub async fn create(&self, log: &DailyLog) -> Result<DailyLog> {
        let result = sqlx::query(
            "INSERT INTO daily_log (id, commitment_id, date, outcome, judge_verified,
             reminder_stage, created_at, resolved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&log.id)
        .bind(&log.commitment_id)
        .bind(log.date.format("%Y-%m-%d").to_string())
        .bind(outcome_str(log.outcome))
        .bind(log.judge_verified)
        .bind(log.reminder_stage)
        .bind(log.created_at.to_rfc3339())
        .bind(log.resolved_at.map(|dt| dt.to_rfc3339()))
        .execute(self.db.as_ref())
        .await;

        match result {
            Ok(_) => Ok(log.clone()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(AppError::Conflict(format!(
                    "log already exists for commitment {} on {}",
                    log.commitment_id, log.date
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Retrieve a log by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<DailyLog>> {
        let row: Option<LogRow> = sqlx::query_as("SELECT * FROM daily_log WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(LogRow::into_log).transpose()
    }

    /// Retrieve the log for a commitment-day, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_for_day(
        &self,
        commitment_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyLog>> {
        let row: Option<LogRow> =
            sqlx::query_as("SELECT * FROM daily_log WHERE commitment_id = ?1 AND date = ?2")
                .bind(commitment_id)
                .bind(date.format("%Y-%m-%d").to_string())
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(LogRow::into_log).transpose()
    }

    /// List all logs for a commitment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_by_commitment(&self, commitment_id: &str) -> Result<Vec<DailyLog>> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT * FROM daily_log WHERE commitment_id = ?1 ORDER BY date ASC",
        )
        .bind(commitment_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }

    /// List all pending logs (scheduler escalation/timeout scan).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<DailyLog>> {
        let rows: Vec<LogRow> = sqlx::query_as("SELECT * FROM daily_log WHERE outcome = 'pending'")
            .fetch_all(self.db.as_ref())
            .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }

    /// List recent logs across all commitments, newest first (admin).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<DailyLog>> {
        let rows: Vec<LogRow> =
            sqlx::query_as("SELECT * FROM daily_log ORDER BY created_at DESC LIMIT ?1")
                .bind(limit)
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }

    /// Resolve a pending log to a terminal outcome.
    ///
    /// Conditional on `outcome = 'pending'`; returns whether this call
    /// performed the resolution.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn resolve(
        &self,
        id: &str,
        outcome: LogOutcome,
        judge_verified: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE daily_log SET outcome = ?1, judge_verified = ?2, resolved_at = ?3
             WHERE id = ?4 AND outcome = 'pending'",
        )
        .bind(outcome_str(outcome))
        .bind(judge_verified)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset a resolved log back to pending (UNDO).
    ///
    /// Conditional on a terminal outcome; returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn reopen(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE daily_log SET outcome = 'pending', judge_verified = NULL, resolved_at = NULL
             WHERE id = ?1 AND outcome IN ('pass', 'fail')",
        )
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a log's outcome regardless of current state (admin
    /// correction; the caller reconciles the ledger delta).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn set_outcome(&self, id: &str, outcome: LogOutcome) -> Result<()> {
        sqlx::query(
            "UPDATE daily_log SET outcome = ?1, judge_verified = 1, resolved_at = ?2
             WHERE id = ?3",
        )
        .bind(outcome_str(outcome))
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Advance the reminder stage, conditional on the expected current
    /// stage so each reminder fires at most once across repeated ticks.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn advance_reminder(&self, id: &str, from: i64, to: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE daily_log SET reminder_stage = ?1
             WHERE id = ?2 AND reminder_stage = ?3 AND outcome = 'pending'",
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
