//! SMS delivery.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::TwilioConfig;
use crate::errors::{AppError, Result};

/// Sends text messages to E.164 phone numbers.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Deliver `body` to `to`.
    ///
    /// # Errors
    /// Returns [`AppError::Sms`] when the provider rejects the message
    /// or the request fails.
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Fire-and-forget send: outbound notifications must never abort the
/// flow that triggered them, so failures are logged and swallowed.
pub async fn send_best_effort(gateway: &dyn SmsGateway, to: &str, body: &str) {
    if let Err(err) = gateway.send(to, body).await {
        warn!(to, %err, "sms delivery failed");
    }
}

/// Twilio Messages API client.
pub struct TwilioGateway {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioGateway {
    /// Build a gateway from the loaded Twilio configuration.
    #[must_use]
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| AppError::Sms(format!("twilio request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Sms(format!(
                "twilio returned {status}: {detail}"
            )));
        }
        debug!(to, "sms sent");
        Ok(())
    }
}

/// In-memory gateway that records every message, for tests.
#[derive(Debug, Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSms {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(to, body)` pair sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages delivered to a single number.
    #[must_use]
    pub fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| recipient == to)
            .map(|(_, body)| body)
            .collect()
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        let mut sent = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push((to.to_owned(), body.to_owned()));
        Ok(())
    }
}
