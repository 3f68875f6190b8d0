//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Nested Twilio configuration for outbound SMS.
///
/// The auth token is loaded at runtime via OS keychain or environment
/// variables, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TwilioConfig {
    /// Twilio account SID.
    pub account_sid: String,
    /// E.164 number messages are sent from.
    pub from_number: String,
    /// Auth token (populated at runtime).
    #[serde(skip)]
    pub auth_token: String,
}

/// Nested Stripe configuration for payment capture and refunds.
///
/// Both secrets are loaded at runtime via OS keychain or environment
/// variables, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StripeConfig {
    /// API secret key (populated at runtime).
    #[serde(skip)]
    pub secret_key: String,
    /// Webhook signing secret (populated at runtime).
    #[serde(skip)]
    pub webhook_secret: String,
}

/// Scheduler timing knobs, all in the committer's local time.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleConfig {
    /// Local hour when the daily check-in is dispatched.
    #[serde(default = "default_check_in_hour")]
    pub check_in_hour: u32,
    /// Hours after check-in before the first judge reminder.
    #[serde(default = "default_first_reminder_offset")]
    pub first_reminder_offset_hours: u32,
    /// Local hour (next morning) for the second judge reminder.
    #[serde(default = "default_second_reminder_hour")]
    pub second_reminder_hour: u32,
    /// Local hour (next day) when an unanswered log defaults to FAIL.
    #[serde(default = "default_timeout_hour")]
    pub timeout_hour: u32,
}

fn default_check_in_hour() -> u32 {
    20
}

fn default_first_reminder_offset() -> u32 {
    2
}

fn default_second_reminder_hour() -> u32 {
    9
}

fn default_timeout_hour() -> u32 {
    12
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_in_hour: default_check_in_hour(),
            first_reminder_offset_hours: default_first_reminder_offset(),
            second_reminder_hour: default_second_reminder_hour(),
            timeout_hour: default_timeout_hour(),
        }
    }
}

fn default_http_port() -> u16 {
    3000
}

fn default_timezone() -> String {
    "America/Los_Angeles".into()
}

fn default_undo_window_minutes() -> i64 {
    5
}

fn default_code_expiry_minutes() -> i64 {
    10
}

fn default_menu_expiry_minutes() -> i64 {
    60
}

fn default_max_signups_per_hour() -> usize {
    3
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stakemate.db")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Public base URL used when building payment links.
    pub app_url: String,
    /// HTTP port for the webhook server.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Path to the `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Operator number allowed to run ADMIN corrections; also receives
    /// the daily refund-failure report.
    pub admin_phone: String,
    /// Numbers exempt from the one-active-commitment and judge
    /// double-booking guards (admin/test numbers).
    #[serde(default)]
    pub whitelisted_phones: Vec<String>,
    /// IANA timezone assumed for committers who never set one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Minutes a judge has to UNDO their most recent verification.
    #[serde(default = "default_undo_window_minutes")]
    pub undo_window_minutes: i64,
    /// Minutes before a dashboard verification code expires.
    #[serde(default = "default_code_expiry_minutes")]
    pub code_expiry_minutes: i64,
    /// Minutes before a judge MENU session expires.
    #[serde(default = "default_menu_expiry_minutes")]
    pub menu_expiry_minutes: i64,
    /// Per-IP signup attempts allowed per rolling hour.
    #[serde(default = "default_max_signups_per_hour")]
    pub max_signups_per_hour: usize,
    /// Twilio connectivity settings.
    pub twilio: TwilioConfig,
    /// Stripe settings (secrets populated at runtime).
    #[serde(default)]
    pub stripe: StripeConfig,
    /// Scheduler timing knobs.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Bearer token for the signup trigger endpoint (populated at runtime).
    #[serde(skip)]
    pub signup_api_token: String,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load gateway credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `stakemate` keyring service first, then falls back to
    /// `TWILIO_AUTH_TOKEN` / `STRIPE_SECRET_KEY` / `STRIPE_WEBHOOK_SECRET`
    /// / `SIGNUP_API_TOKEN` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// a required secret.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.twilio.auth_token = load_credential("twilio_auth_token", "TWILIO_AUTH_TOKEN").await?;
        self.stripe.secret_key = load_credential("stripe_secret_key", "STRIPE_SECRET_KEY").await?;
        self.stripe.webhook_secret =
            load_credential("stripe_webhook_secret", "STRIPE_WEBHOOK_SECRET").await?;
        self.signup_api_token = load_credential("signup_api_token", "SIGNUP_API_TOKEN").await?;
        Ok(())
    }

    /// Whether a normalized phone number is exempt from the single-
    /// commitment and judge double-booking guards.
    #[must_use]
    pub fn is_whitelisted(&self, phone: &str) -> bool {
        self.whitelisted_phones.iter().any(|p| p == phone)
    }

    /// Whether a normalized phone number is the operator.
    #[must_use]
    pub fn is_admin(&self, phone: &str) -> bool {
        self.admin_phone == phone
    }

    fn validate(&self) -> Result<()> {
        if self.app_url.is_empty() {
            return Err(AppError::Config("app_url must not be empty".into()));
        }
        if self.admin_phone.is_empty() {
            return Err(AppError::Config("admin_phone must not be empty".into()));
        }
        if self.schedule.check_in_hour > 23
            || self.schedule.second_reminder_hour > 23
            || self.schedule.timeout_hour > 23
        {
            return Err(AppError::Config(
                "schedule hours must be within 0..=23".into(),
            ));
        }
        if self.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(AppError::Config(format!(
                "default_timezone is not a valid IANA zone: {}",
                self.default_timezone
            )));
        }
        if self.undo_window_minutes <= 0 {
            return Err(AppError::Config(
                "undo_window_minutes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new("stakemate", &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
