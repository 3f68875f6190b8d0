//! Dashboard access: a 4-digit code texted to the committer, exchanged
//! once for a snapshot of their commitments.

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::gateways::sms::send_best_effort;
use crate::models::commitment::Commitment;
use crate::models::daily_log::DailyLog;
use crate::parse::phone::normalize_phone;
use crate::state::AppState;
use crate::AppError;

/// Code request body.
#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    /// Phone number in any common format.
    pub phone: String,
}

/// Generic acknowledgement that leaks nothing about the phone.
#[derive(Debug, Serialize)]
pub struct CodeResponse {
    /// Always true.
    pub sent: bool,
}

/// Dashboard view request body.
#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    /// Phone number in any common format.
    pub phone: String,
    /// The 4-digit code from the text.
    pub code: String,
}

/// The committer's dashboard snapshot.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    /// Open commitment, if any.
    pub active: Option<Commitment>,
    /// Logs for the open commitment, oldest first.
    pub logs: Vec<DailyLog>,
    /// Completed commitments, newest first.
    pub history: Vec<Commitment>,
}

/// Text a short-lived verification code to the phone.
///
/// The response is identical whether or not the phone is known, so the
/// endpoint cannot be used to probe for accounts.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, AppError> {
    let phone = normalize_phone(&req.phone);
    let known = state.commitments().get_open_by_phone(&phone).await?.is_some()
        || !state
            .commitments()
            .list_completed_by_phone(&phone, 1)
            .await?
            .is_empty();

    if known {
        let code = format!("{:04}", rand::thread_rng().gen_range(0..10_000));
        let expires_at = Utc::now() + Duration::minutes(state.config.code_expiry_minutes);
        state.verify_codes().put(&phone, &code, expires_at).await?;
        info!(%phone, "dashboard code issued");
        send_best_effort(
            state.sms.as_ref(),
            &phone,
            &format!(
                "Your dashboard code is {code}. It expires in {} minutes.",
                state.config.code_expiry_minutes
            ),
        )
        .await;
    }
    Ok(Json(CodeResponse { sent: true }))
}

/// Exchange a code for the dashboard snapshot. Codes are single-use.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the code is wrong, expired, or
/// already used.
pub async fn view(
    State(state): State<AppState>,
    Json(req): Json<ViewRequest>,
) -> Result<Json<DashboardView>, AppError> {
    let phone = normalize_phone(&req.phone);
    if !state.verify_codes().take(&phone, req.code.trim()).await? {
        return Err(AppError::Unauthorized("invalid or expired code".to_owned()));
    }

    let active = state.commitments().get_open_by_phone(&phone).await?;
    let logs = match &active {
        Some(c) => state.logs().list_by_commitment(&c.id).await?,
        None => Vec::new(),
    };
    let history = state.commitments().list_completed_by_phone(&phone, 20).await?;
    Ok(Json(DashboardView {
        active,
        logs,
        history,
    }))
}
