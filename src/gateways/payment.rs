//! Payment processing.
//!
//! Amounts cross this boundary in whole dollars and are converted to
//! cents for the processor; nothing else in the crate deals in cents.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{AppError, Result};

/// Seconds a webhook signature timestamp may lag before rejection.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// A payment intent as the rest of the crate sees it.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// Processor-assigned identifier.
    pub id: String,
    /// Client secret for the hosted payment page.
    pub client_secret: String,
    /// Processor status string, e.g. `succeeded`.
    pub status: String,
}

/// Creates, inspects, and refunds stake payments.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an intent for `amount` whole dollars, tagged with the
    /// staged commitment terms so the processor record stands on its
    /// own and webhooks can be matched back.
    ///
    /// # Errors
    /// Returns [`AppError::Payment`] when the processor rejects the
    /// request.
    async fn create_intent(&self, amount: i64, metadata: &[(&str, String)])
        -> Result<PaymentIntent>;

    /// Fetch an intent's current state.
    ///
    /// # Errors
    /// Returns [`AppError::Payment`] on processor failure and
    /// [`AppError::NotFound`] for unknown identifiers.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;

    /// Refund `amount` whole dollars of a captured intent.
    ///
    /// # Errors
    /// Returns [`AppError::Payment`] when the refund is rejected.
    async fn refund(&self, intent_id: &str, amount: i64) -> Result<()>;
}

/// Stripe client over the form-encoded HTTP API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

#[derive(serde::Deserialize)]
struct StripeIntentBody {
    id: String,
    client_secret: Option<String>,
    status: String,
}

impl StripeGateway {
    /// Build a gateway from the loaded secret key.
    #[must_use]
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.to_owned(),
        }
    }

    async fn post_form(&self, url: &str, params: &[(String, String)]) -> Result<StripeIntentBody> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("stripe request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Payment(format!("stripe response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(AppError::Payment(format!("stripe returned {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| AppError::Payment(format!("stripe response malformed: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount: i64,
        metadata: &[(&str, String)],
    ) -> Result<PaymentIntent> {
        let cents = amount
            .checked_mul(100)
            .ok_or_else(|| AppError::Payment("amount overflows cents".to_owned()))?;
        let mut params = vec![
            ("amount".to_owned(), cents.to_string()),
            ("currency".to_owned(), "usd".to_owned()),
        ];
        for (key, value) in metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }
        let body = self
            .post_form("https://api.stripe.com/v1/payment_intents", &params)
            .await?;
        Ok(PaymentIntent {
            id: body.id,
            client_secret: body.client_secret.unwrap_or_default(),
            status: body.status,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        let url = format!("https://api.stripe.com/v1/payment_intents/{intent_id}");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("stripe request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("payment intent {intent_id}")));
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Payment(format!("stripe response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(AppError::Payment(format!("stripe returned {status}: {body}")));
        }
        let parsed: StripeIntentBody = serde_json::from_str(&body)
            .map_err(|e| AppError::Payment(format!("stripe response malformed: {e}")))?;
        Ok(PaymentIntent {
            id: parsed.id,
            client_secret: parsed.client_secret.unwrap_or_default(),
            status: parsed.status,
        })
    }

    async fn refund(&self, intent_id: &str, amount: i64) -> Result<()> {
        let cents = amount
            .checked_mul(100)
            .ok_or_else(|| AppError::Payment("amount overflows cents".to_owned()))?;
        self.post_form(
            "https://api.stripe.com/v1/refunds",
            &[
                ("payment_intent".to_owned(), intent_id.to_owned()),
                ("amount".to_owned(), cents.to_string()),
            ],
        )
        .await?;
        Ok(())
    }
}

/// Verify a Stripe webhook signature header against the raw payload.
///
/// The header carries `t=<unix>,v1=<hex>` pairs; the expected MAC is
/// HMAC-SHA256 of `"{t}.{payload}"` under the endpoint secret, and the
/// timestamp must be within tolerance of `now_unix`.
#[must_use]
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let Some(timestamp) = timestamp else {
        return false;
    };
    if signatures.is_empty() || (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    signatures.iter().any(|sig| *sig == expected)
}

/// Build a signature header the way the processor would, for tests.
#[must_use]
pub fn sign_webhook_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Default)]
struct FakeState {
    intents: HashMap<String, PaymentIntent>,
    metadata: HashMap<String, Vec<(String, String)>>,
    refunds: Vec<(String, i64)>,
    fail_refunds: bool,
    next_id: u64,
}

/// In-memory processor for tests: intents succeed on demand and
/// refunds are recorded, with an optional failure switch.
#[derive(Debug, Default)]
pub struct FakePayments {
    state: Mutex<FakeState>,
}

impl FakePayments {
    /// Empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Flip an intent to `succeeded`, as a completed checkout would.
    pub fn mark_succeeded(&self, intent_id: &str) {
        if let Some(intent) = self.lock().intents.get_mut(intent_id) {
            intent.status = "succeeded".to_owned();
        }
    }

    /// Make every subsequent refund call fail.
    pub fn fail_refunds(&self) {
        self.lock().fail_refunds = true;
    }

    /// Refunds issued so far as `(intent_id, dollars)` pairs.
    #[must_use]
    pub fn refunds(&self) -> Vec<(String, i64)> {
        self.lock().refunds.clone()
    }

    /// Metadata pairs an intent was created with.
    #[must_use]
    pub fn metadata_for(&self, intent_id: &str) -> Vec<(String, String)> {
        self.lock().metadata.get(intent_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_intent(
        &self,
        _amount: i64,
        metadata: &[(&str, String)],
    ) -> Result<PaymentIntent> {
        let mut state = self.lock();
        state.next_id += 1;
        let intent = PaymentIntent {
            id: format!("pi_test_{}", state.next_id),
            client_secret: format!("pi_test_{}_secret", state.next_id),
            status: "requires_payment_method".to_owned(),
        };
        state.intents.insert(intent.id.clone(), intent.clone());
        state.metadata.insert(
            intent.id.clone(),
            metadata
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        );
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.lock()
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("payment intent {intent_id}")))
    }

    async fn refund(&self, intent_id: &str, amount: i64) -> Result<()> {
        let mut state = self.lock();
        if state.fail_refunds {
            return Err(AppError::Payment("refund rejected".to_owned()));
        }
        state.refunds.push((intent_id.to_owned(), amount));
        Ok(())
    }
}
