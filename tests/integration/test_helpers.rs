//! Shared fixtures: a full `AppState` over an in-memory database with
//! recording gateways, plus seed helpers for commitments mid-lifecycle.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use stakemate::clock;
use stakemate::config::GlobalConfig;
use stakemate::flows::router;
use stakemate::gateways::{FakePayments, PaymentGateway, RecordingSms, SmsGateway};
use stakemate::interpreter::RuleInterpreter;
use stakemate::models::commitment::{Commitment, CommitmentType};
use stakemate::models::daily_log::DailyLog;
use stakemate::models::judge::{ConsentStatus, JudgeRecord};
use stakemate::persistence::db;
use stakemate::state::AppState;

pub const COMMITTER: &str = "+15551110000";
pub const JUDGE: &str = "+15557770000";
pub const ADMIN: &str = "+15550000001";
pub const TZ: &str = "America/Los_Angeles";

/// Minimal valid configuration with test secrets injected the way the
/// credential loader would.
pub fn test_config() -> GlobalConfig {
    let toml = r#"
app_url = "https://stake.test"
admin_phone = "+15550000001"
default_timezone = "America/Los_Angeles"

[twilio]
account_sid = "ACtest"
from_number = "+15550000000"
"#;
    let mut config = GlobalConfig::from_toml_str(toml).expect("valid config");
    config.stripe.webhook_secret = "whsec_test".to_owned();
    config.signup_api_token = "signup_test_token".to_owned();
    config
}

/// Application state plus handles onto the recording gateways.
pub struct TestHarness {
    pub state: AppState,
    pub sms: Arc<RecordingSms>,
    pub payments: Arc<FakePayments>,
}

pub async fn harness() -> TestHarness {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let sms = Arc::new(RecordingSms::new());
    let payments = Arc::new(FakePayments::new());
    let state = AppState::new(
        Arc::new(test_config()),
        db,
        Arc::clone(&sms) as Arc<dyn SmsGateway>,
        Arc::clone(&payments) as Arc<dyn PaymentGateway>,
        Arc::new(RuleInterpreter),
    );
    TestHarness {
        state,
        sms,
        payments,
    }
}

/// Today in the default committer timezone.
pub fn today_local() -> NaiveDate {
    clock::local_date(Utc::now(), chrono_tz::America::Los_Angeles)
}

/// Route one inbound message and return the reply it earned.
pub async fn send(h: &TestHarness, from: &str, body: &str) -> String {
    router::handle_inbound(&h.state, from, body)
        .await
        .expect("inbound handled");
    h.sms.sent_to(from).last().cloned().expect("reply sent")
}

/// Seed an active daily commitment with an accepted judge, already one
/// day into its run.
pub async fn seed_active_daily(
    h: &TestHarness,
    phone: &str,
    name: Option<&str>,
    stake: i64,
    penalty: i64,
    intent_id: &str,
) -> Commitment {
    let today = today_local();
    let commitment = Commitment::new(
        phone.to_owned(),
        name.map(str::to_owned),
        "run every morning".to_owned(),
        CommitmentType::Daily,
        TZ.to_owned(),
        today - chrono::Days::new(1),
        today + chrono::Days::new(8),
        None,
        stake,
        penalty,
        JUDGE.to_owned(),
        "Jo".to_owned(),
        intent_id.to_owned(),
    );
    accept_and_activate(h, commitment).await
}

/// Seed an active deadline commitment whose deadline is today.
pub async fn seed_active_deadline(
    h: &TestHarness,
    phone: &str,
    stake: i64,
    intent_id: &str,
) -> Commitment {
    let today = today_local();
    let commitment = Commitment::new(
        phone.to_owned(),
        Some("Sam".to_owned()),
        "finish the thesis draft".to_owned(),
        CommitmentType::Deadline,
        TZ.to_owned(),
        today - chrono::Days::new(1),
        today,
        Some(today),
        stake,
        stake,
        JUDGE.to_owned(),
        "Jo".to_owned(),
        intent_id.to_owned(),
    );
    accept_and_activate(h, commitment).await
}

async fn accept_and_activate(h: &TestHarness, commitment: Commitment) -> Commitment {
    let commitment = h
        .state
        .commitments()
        .create(&commitment)
        .await
        .expect("create commitment");
    let judge = h
        .state
        .judges()
        .create(&JudgeRecord::new(JUDGE.to_owned(), commitment.id.clone()))
        .await
        .expect("create judge");
    h.state
        .judges()
        .set_consent(&judge.id, ConsentStatus::Accepted)
        .await
        .expect("consent");
    h.state
        .commitments()
        .activate(&commitment.id)
        .await
        .expect("activate");
    h.state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present")
}

/// Open today's pending check-in log for a commitment.
pub async fn pending_log_today(h: &TestHarness, commitment: &Commitment) -> DailyLog {
    h.state
        .logs()
        .create(&DailyLog::new(commitment.id.clone(), today_local()))
        .await
        .expect("create log")
}
