//! Stripe webhook: signature verification and payment finalization.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::flows::lifecycle;
use crate::gateways::payment::verify_webhook_signature;
use crate::state::AppState;
use crate::AppError;

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeObject,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

/// Handle a Stripe event.
///
/// The raw body is verified against the `Stripe-Signature` header
/// before any parsing. Only `payment_intent.succeeded` does anything;
/// every other event type is acknowledged and dropped. Once the
/// signature checks out the event is always acknowledged, so Stripe
/// does not redeliver on payloads or failures we can't act on.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for missing or invalid signatures.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing stripe signature".to_owned()))?;

    if !verify_webhook_signature(
        &state.config.stripe.webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
    ) {
        warn!("stripe webhook signature rejected");
        return Err(AppError::Unauthorized("invalid stripe signature".to_owned()));
    }

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "malformed stripe event acknowledged");
            return Ok(StatusCode::OK);
        }
    };

    if event.event_type == "payment_intent.succeeded" {
        if let Err(err) = lifecycle::finalize_paid_intent(&state, &event.data.object.id).await {
            error!(intent_id = %event.data.object.id, %err, "payment finalization failed");
        }
    } else {
        info!(event_type = %event.event_type, "stripe event ignored");
    }
    Ok(StatusCode::OK)
}
