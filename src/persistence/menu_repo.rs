//! Judge MENU session repository.
//!
//! A MENU session is time-boxed and single-use: superseded by a fresh
//! MENU call and deactivated after the first valid numbered response.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

use super::db::Database;

/// One verifiable commitment offered in a MENU.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MenuChoice {
    /// Commitment the choice targets.
    pub commitment_id: String,
    /// Existing log for today, when one was already dispatched.
    pub log_id: Option<String>,
    /// Committer's phone for notifications.
    pub committer_phone: String,
    /// Short label shown to the judge (last four digits or name).
    pub label: String,
    /// Commitment text shown in the menu.
    pub commitment_text: String,
}

/// An active MENU session for a judge phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSession {
    /// Unique record identifier.
    pub id: String,
    /// Judge the menu was sent to.
    pub judge_phone: String,
    /// Offered choices, in menu order.
    pub choices: Vec<MenuChoice>,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

/// Repository wrapper around `SQLite` for menu sessions.
#[derive(Clone)]
pub struct MenuRepo {
    db: Arc<Database>,
}

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: String,
    judge_phone: String,
    choices: String,
    expires_at: String,
}

impl MenuRow {
    fn into_session(self) -> Result<MenuSession> {
        let expires_at = chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map_err(|e| AppError::Db(format!("invalid expires_at: {e}")))?
            .with_timezone(&Utc);
        let choices: Vec<MenuChoice> = serde_json::from_str(&self.choices)
            .map_err(|e| AppError::Db(format!("invalid menu choices: {e}")))?;

        Ok(MenuSession {
            id: self.id,
            judge_phone: self.judge_phone,
            choices,
            expires_at,
        })
    }
}

impl MenuRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a fresh session, superseding any prior active session for
    /// the same judge phone.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create(
        &self,
        judge_phone: &str,
        choices: &[MenuChoice],
        expires_at: DateTime<Utc>,
    ) -> Result<MenuSession> {
        sqlx::query("UPDATE menu_session SET active = 0 WHERE judge_phone = ?1 AND active = 1")
            .bind(judge_phone)
            .execute(self.db.as_ref())
            .await?;

        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(choices)
            .map_err(|e| AppError::Db(format!("cannot serialize menu choices: {e}")))?;

        sqlx::query(
            "INSERT INTO menu_session (id, judge_phone, choices, active, expires_at, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)",
        )
        .bind(&id)
        .bind(judge_phone)
        .bind(&payload)
        .bind(expires_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(MenuSession {
            id,
            judge_phone: judge_phone.to_owned(),
            choices: choices.to_vec(),
            expires_at,
        })
    }

    /// The judge's active, unexpired session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_active(&self, judge_phone: &str) -> Result<Option<MenuSession>> {
        let row: Option<MenuRow> = sqlx::query_as(
            "SELECT id, judge_phone, choices, expires_at FROM menu_session
             WHERE judge_phone = ?1 AND active = 1 AND expires_at > ?2
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(judge_phone)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(MenuRow::into_session).transpose()
    }

    /// Deactivate a session after its first valid response.
    ///
    /// Returns whether this call performed the deactivation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn deactivate(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE menu_session SET active = 0 WHERE id = ?1 AND active = 1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired sessions (expiry sweep).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_expired(&self) -> Result<()> {
        sqlx::query("DELETE FROM menu_session WHERE expires_at < ?1")
            .bind(Utc::now().to_rfc3339())
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }
}
