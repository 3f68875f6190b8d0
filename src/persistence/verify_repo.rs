//! Dashboard verification code repository.
//!
//! Codes are short-lived and single-use: `take` atomically deletes the
//! matching row, so a code can never be exchanged twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::Result;

use super::db::Database;

/// Repository wrapper around `SQLite` for verification codes.
#[derive(Clone)]
pub struct VerifyRepo {
    db: Arc<Database>,
}

impl VerifyRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store (or replace) the code for a phone.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn put(&self, phone: &str, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO verify_code (phone, code, expires_at) VALUES (?1, ?2, ?3)",
        )
        .bind(phone)
        .bind(code)
        .bind(expires_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(())
    }

    /// Exchange a code: deletes the row when phone and code match and
    /// the code is unexpired. Returns whether the exchange succeeded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn take(&self, phone: &str, code: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM verify_code WHERE phone = ?1 AND code = ?2 AND expires_at > ?3",
        )
        .bind(phone)
        .bind(code)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired codes (expiry sweep).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_expired(&self) -> Result<()> {
        sqlx::query("DELETE FROM verify_code WHERE expires_at < ?1")
            .bind(Utc::now().to_rfc3339())
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }
}
