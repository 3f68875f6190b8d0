//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`, safe to
//! re-run on every server startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates every table idempotently. Safe to call on every startup.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS commitment (
    id                  TEXT PRIMARY KEY NOT NULL,
    phone               TEXT NOT NULL,
    name                TEXT,
    commitment_text     TEXT NOT NULL,
    commitment_type     TEXT NOT NULL CHECK(commitment_type IN ('daily','deadline')),
    timezone            TEXT NOT NULL,
    start_date          TEXT NOT NULL,
    end_date            TEXT NOT NULL,
    deadline_date       TEXT,
    original_stake      INTEGER NOT NULL,
    stake_remaining     INTEGER NOT NULL,
    penalty_per_failure INTEGER NOT NULL,
    judge_phone         TEXT NOT NULL,
    judge_name          TEXT NOT NULL,
    payment_intent_id   TEXT,
    status              TEXT NOT NULL CHECK(status IN ('awaiting_judge','judge_declined','active','completed')),
    refund_status       TEXT CHECK(refund_status IN ('pending','refunded','no_refund','failed')),
    refund_amount       INTEGER,
    refund_error        TEXT,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS judge (
    id              TEXT PRIMARY KEY NOT NULL,
    phone           TEXT NOT NULL,
    commitment_id   TEXT NOT NULL,
    consent_status  TEXT NOT NULL CHECK(consent_status IN ('pending','accepted','declined')),
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_log (
    id              TEXT PRIMARY KEY NOT NULL,
    commitment_id   TEXT NOT NULL,
    date            TEXT NOT NULL,
    outcome         TEXT NOT NULL CHECK(outcome IN ('pending','pass','fail')),
    judge_verified  INTEGER,
    reminder_stage  INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    resolved_at     TEXT,
    UNIQUE(commitment_id, date)
);

CREATE TABLE IF NOT EXISTS setup_session (
    phone                TEXT PRIMARY KEY NOT NULL,
    current_step         TEXT NOT NULL,
    temp_name            TEXT,
    temp_commitment      TEXT,
    temp_commitment_type TEXT,
    temp_stake_amount    INTEGER,
    temp_duration_days   INTEGER,
    temp_deadline_date   TEXT,
    temp_penalty         INTEGER,
    temp_judge_phone     TEXT,
    temp_judge_name      TEXT,
    temp_timezone        TEXT NOT NULL,
    payment_intent_id    TEXT,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payout (
    id              TEXT PRIMARY KEY NOT NULL,
    commitment_id   TEXT NOT NULL,
    judge_phone     TEXT NOT NULL,
    amount          INTEGER NOT NULL,
    reason          TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS undo_entry (
    id              TEXT PRIMARY KEY NOT NULL,
    judge_phone     TEXT NOT NULL,
    commitment_id   TEXT NOT NULL,
    log_id          TEXT NOT NULL,
    prior_outcome   TEXT NOT NULL CHECK(prior_outcome IN ('pass','fail')),
    monetary_delta  INTEGER NOT NULL,
    consumed        INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS menu_session (
    id              TEXT PRIMARY KEY NOT NULL,
    judge_phone     TEXT NOT NULL,
    choices         TEXT NOT NULL,
    active          INTEGER NOT NULL DEFAULT 1,
    expires_at      TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS verify_code (
    phone           TEXT PRIMARY KEY NOT NULL,
    code            TEXT NOT NULL,
    expires_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_commitment_phone ON commitment(phone);
CREATE INDEX IF NOT EXISTS idx_commitment_status ON commitment(status);
CREATE INDEX IF NOT EXISTS idx_judge_phone ON judge(phone);
CREATE INDEX IF NOT EXISTS idx_log_commitment ON daily_log(commitment_id);
CREATE INDEX IF NOT EXISTS idx_log_date ON daily_log(date);
CREATE INDEX IF NOT EXISTS idx_payout_commitment ON payout(commitment_id);
CREATE INDEX IF NOT EXISTS idx_undo_judge ON undo_entry(judge_phone);
CREATE INDEX IF NOT EXISTS idx_menu_judge ON menu_session(judge_phone);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
