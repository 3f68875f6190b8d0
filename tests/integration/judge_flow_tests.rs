//! Judge consent: funding notifications, YES/NO replies, and refunds
//! when the judge declines.

use stakemate::flows::lifecycle;
use stakemate::models::commitment::{CommitmentStatus, CommitmentType};
use stakemate::models::setup::{SetupSession, SetupStep};

use super::test_helpers::{harness, send, TestHarness, COMMITTER, JUDGE, TZ};

async fn paid_session(h: &TestHarness, stake: i64) {
    let mut session = SetupSession::start(COMMITTER.to_owned(), TZ.to_owned());
    session.current_step = SetupStep::AwaitingPayment;
    session.temp_name = Some("Sam".to_owned());
    session.temp_commitment = Some("run every morning".to_owned());
    session.temp_commitment_type = Some(CommitmentType::Daily);
    session.temp_stake_amount = Some(stake);
    session.temp_duration_days = Some(10);
    session.temp_penalty = Some(stake / 10);
    session.temp_judge_phone = Some(JUDGE.to_owned());
    session.temp_judge_name = Some("Jo".to_owned());
    session.payment_intent_id = Some("pi_test_1".to_owned());
    h.state.setups().save(&session).await.expect("save session");
    lifecycle::finalize_paid_intent(&h.state, "pi_test_1")
        .await
        .expect("finalize");
}

#[tokio::test]
async fn redelivered_webhook_is_a_no_op() {
    let h = harness().await;
    paid_session(&h, 50).await;

    lifecycle::finalize_paid_intent(&h.state, "pi_test_1")
        .await
        .expect("finalize again");

    // Still exactly one consent request and one commitment.
    assert_eq!(h.sms.sent_to(JUDGE).len(), 1);
    assert!(h
        .state
        .commitments()
        .get_open_by_phone(COMMITTER)
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn retry_with_a_stale_session_does_not_fund_twice() {
    let h = harness().await;
    paid_session(&h, 50).await;

    // A crash between commitment creation and session cleanup leaves
    // the session behind; the retry must not build a second commitment.
    let mut stale = SetupSession::start(COMMITTER.to_owned(), TZ.to_owned());
    stale.current_step = SetupStep::AwaitingPayment;
    stale.temp_commitment = Some("run every morning".to_owned());
    stale.temp_commitment_type = Some(CommitmentType::Daily);
    stale.temp_stake_amount = Some(50);
    stale.temp_judge_phone = Some(JUDGE.to_owned());
    stale.payment_intent_id = Some("pi_test_1".to_owned());
    h.state.setups().save(&stale).await.expect("save stale session");

    lifecycle::finalize_paid_intent(&h.state, "pi_test_1")
        .await
        .expect("finalize retry");

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM commitment WHERE payment_intent_id = 'pi_test_1'",
    )
    .fetch_one(h.state.db.as_ref())
    .await
    .expect("count");
    assert_eq!(count, 1);
    // The retry finishes the cleanup the crash skipped.
    assert!(h
        .state
        .setups()
        .get(COMMITTER)
        .await
        .expect("get session")
        .is_none());
    assert_eq!(h.sms.sent_to(JUDGE).len(), 1);
}

#[tokio::test]
async fn yes_activates_the_commitment() {
    let h = harness().await;
    paid_session(&h, 50).await;

    let reply = send(&h, JUDGE, "YES").await;
    assert!(reply.contains("Thanks for judging"), "got: {reply}");

    let commitment = h
        .state
        .commitments()
        .get_open_by_phone(COMMITTER)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(commitment.status, CommitmentStatus::Active);

    let notes = h.sms.sent_to(COMMITTER);
    assert!(
        notes.iter().any(|m| m.contains("Jo accepted!")),
        "got: {notes:?}"
    );
    assert!(h.payments.refunds().is_empty());
}

#[tokio::test]
async fn no_declines_and_refunds_in_full() {
    let h = harness().await;
    paid_session(&h, 50).await;

    let reply = send(&h, JUDGE, "NO").await;
    assert!(reply.contains("let them know"), "got: {reply}");

    let commitment = h
        .state
        .commitments()
        .get_active_by_phone(COMMITTER)
        .await
        .expect("get");
    assert!(commitment.is_none());

    // Full stake back, committer told to restart.
    assert_eq!(h.payments.refunds(), vec![("pi_test_1".to_owned(), 50)]);
    let notes = h.sms.sent_to(COMMITTER);
    assert!(
        notes
            .iter()
            .any(|m| m.contains("declined") && m.contains("Text START to try again")),
        "got: {notes:?}"
    );
}

#[tokio::test]
async fn consent_does_not_flip_after_the_first_answer() {
    let h = harness().await;
    paid_session(&h, 50).await;
    send(&h, JUDGE, "YES").await;

    // A later NO is no longer a consent answer; the commitment stays
    // active and unharmed.
    send(&h, JUDGE, "NO").await;
    let commitment = h
        .state
        .commitments()
        .get_open_by_phone(COMMITTER)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(commitment.status, CommitmentStatus::Active);
    assert_eq!(commitment.stake_remaining, 50);
    assert!(h.payments.refunds().is_empty());
}
