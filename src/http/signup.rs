//! Signup trigger: the public landing page posts here and the service
//! texts the invitation.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateways::sms::send_best_effort;
use crate::parse::phone::{is_plausible_phone, normalize_phone};
use crate::state::AppState;
use crate::AppError;

/// Signup request body. `website` and `email_confirm` are honeypot
/// fields the real form never fills.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Phone number in any common format.
    pub phone: String,
    /// Honeypot; bots fill it, humans never see it.
    #[serde(default)]
    pub website: Option<String>,
    /// Honeypot.
    #[serde(default)]
    pub email_confirm: Option<String>,
}

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    /// Always true; bot traps return it too.
    pub ok: bool,
}

fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map_or_else(|| addr.ip().to_string(), |ip| ip.trim().to_owned())
}

/// Send the invitation text.
///
/// Requires the signup bearer token; honeypot submissions get a fake
/// success and no text; each client IP is throttled.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` without the token,
/// `AppError::Conflict` when the IP is over its hourly allowance, and
/// `AppError::InvalidInput` for implausible phone numbers.
pub async fn invite(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if state.config.signup_api_token.is_empty() || token != state.config.signup_api_token {
        return Err(AppError::Unauthorized("invalid signup token".to_owned()));
    }

    // Bots that fill the hidden fields get a success and nothing else.
    let trapped = req.website.as_deref().is_some_and(|s| !s.is_empty())
        || req.email_confirm.as_deref().is_some_and(|s| !s.is_empty());
    if trapped {
        info!("signup honeypot tripped");
        return Ok(Json(SignupResponse { ok: true }));
    }

    let ip = client_ip(&headers, addr);
    let attempts = state.signup_limiter.record(&ip, Utc::now());
    if attempts > state.config.max_signups_per_hour {
        warn!(%ip, attempts, "signup rate limit exceeded");
        return Err(AppError::Conflict("too many signups from this address".to_owned()));
    }

    let phone = normalize_phone(&req.phone);
    if !is_plausible_phone(&phone) {
        return Err(AppError::InvalidInput("phone number looks wrong".to_owned()));
    }

    send_best_effort(
        state.sms.as_ref(),
        &phone,
        "Welcome! Text START to stake money on a commitment and pick your judge.",
    )
    .await;
    info!(%phone, "signup invitation sent");
    Ok(Json(SignupResponse { ok: true }))
}
