//! HTTP surface: provider webhooks, the payment page's intent lookup,
//! the dashboard code exchange, and the signup trigger.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::state::AppState;
use crate::{AppError, Result};

pub mod dashboard;
pub mod payment;
pub mod signup;
pub mod sms;
pub mod stripe;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Sms(_) | AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(%self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Assemble the application router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sms", post(sms::inbound))
        .route("/stripe-webhook", post(stripe::webhook))
        .route("/payment-intent/{id}", get(payment::get_intent))
        .route("/dashboard/code", post(dashboard::request_code))
        .route("/dashboard", post(dashboard::view))
        .route("/signup", post(signup::invite))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Serve HTTP on `config.http_port` until cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener fails to bind.
pub async fn serve(state: AppState, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind http on {bind}: {err}")))?;
    info!(%bind, "http server listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        ct.cancelled().await;
    })
    .await
    .map_err(|err| AppError::Config(format!("http server failed: {err}")))
}
