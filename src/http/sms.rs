//! Twilio inbound-message webhook.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Form;
use serde::Deserialize;
use tracing::error;

use crate::flows::router;
use crate::state::AppState;

/// The fields Twilio posts that we care about.
#[derive(Debug, Deserialize)]
pub struct TwilioInbound {
    /// Sender, already E.164.
    #[serde(rename = "From")]
    pub from: String,
    /// Message text.
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Handle an inbound message.
///
/// Replies always go out through the messaging API, so the webhook
/// response is an empty TwiML document regardless of processing
/// outcome; a non-200 here would only make Twilio retry the delivery.
pub async fn inbound(
    State(state): State<AppState>,
    Form(inbound): Form<TwilioInbound>,
) -> impl IntoResponse {
    if let Err(err) = router::handle_inbound(&state, &inbound.from, &inbound.body).await {
        error!(from = %inbound.from, %err, "inbound sms handling failed");
    }
    (
        [(header::CONTENT_TYPE, "text/xml")],
        "<Response></Response>",
    )
}
