//! The judge MENU for multi-committer judges, and the UNDO window.

use chrono::Utc;
use stakemate::models::commitment::CommitmentStatus;
use stakemate::models::daily_log::LogOutcome;

use super::test_helpers::{
    harness, pending_log_today, seed_active_daily, seed_active_deadline, send, COMMITTER, JUDGE,
};

const OTHER: &str = "+15552220000";

#[tokio::test]
async fn single_choice_menu_verifies_with_one_and_two() {
    let h = harness().await;
    let commitment = seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;
    pending_log_today(&h, &commitment).await;

    let reply = send(&h, JUDGE, "MENU").await;
    assert!(
        reply.contains("Reply 1 if they did it, 2 if they didn't"),
        "got: {reply}"
    );

    let reply = send(&h, JUDGE, "2").await;
    assert!(reply.contains("$5 was debited"), "got: {reply}");

    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.stake_remaining, 45);
}

#[tokio::test]
async fn multi_choice_menu_numbers_pass_odd_fail_even() {
    let h = harness().await;
    let first = seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;
    let second = seed_active_daily(&h, OTHER, Some("Alex"), 30, 3, "pi_b").await;
    pending_log_today(&h, &first).await;
    pending_log_today(&h, &second).await;

    let reply = send(&h, JUDGE, "MENU").await;
    assert!(reply.contains("Who are you verifying?"), "got: {reply}");
    assert!(
        reply.contains("Sam") && reply.contains("reply 1 for done, 2 for not done"),
        "got: {reply}"
    );
    assert!(
        reply.contains("Alex") && reply.contains("reply 3 for done, 4 for not done"),
        "got: {reply}"
    );

    // 4 = second entry, fail.
    let reply = send(&h, JUDGE, "4").await;
    assert!(reply.contains("$3 was debited"), "got: {reply}");

    let first = h
        .state
        .commitments()
        .get_by_id(&first.id)
        .await
        .expect("get")
        .expect("present");
    let second = h
        .state
        .commitments()
        .get_by_id(&second.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(first.stake_remaining, 50);
    assert_eq!(second.stake_remaining, 27);
}

#[tokio::test]
async fn menus_are_single_use() {
    let h = harness().await;
    let commitment = seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;
    pending_log_today(&h, &commitment).await;

    send(&h, JUDGE, "MENU").await;
    send(&h, JUDGE, "1").await;

    // The menu is spent; the number no longer lands anywhere.
    let reply = send(&h, JUDGE, "1").await;
    assert!(reply.contains("I didn't catch that"), "got: {reply}");
}

#[tokio::test]
async fn ambiguous_yes_is_answered_with_a_menu() {
    let h = harness().await;
    let first = seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;
    let second = seed_active_daily(&h, OTHER, Some("Alex"), 30, 3, "pi_b").await;
    pending_log_today(&h, &first).await;
    pending_log_today(&h, &second).await;

    let reply = send(&h, JUDGE, "YES").await;
    assert!(reply.contains("Who are you verifying?"), "got: {reply}");

    // Nothing was resolved by the ambiguous reply.
    for commitment in [&first, &second] {
        let logs = h
            .state
            .logs()
            .list_by_commitment(&commitment.id)
            .await
            .expect("logs");
        assert_eq!(logs[0].outcome, LogOutcome::Pending);
    }
}

#[tokio::test]
async fn empty_menu_when_nothing_is_verifiable() {
    let h = harness().await;
    // Active commitment, but no pending log today and not a deadline.
    seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;

    let reply = send(&h, JUDGE, "MENU").await;
    assert!(reply.contains("Nothing to verify right now"), "got: {reply}");
}

#[tokio::test]
async fn deadline_commitments_can_be_settled_early_from_the_menu() {
    let h = harness().await;
    let commitment = seed_active_deadline(&h, COMMITTER, 75, "pi_a").await;

    // No log dispatched yet; the menu still offers the deadline.
    let reply = send(&h, JUDGE, "MENU").await;
    assert!(reply.contains("finish the thesis draft"), "got: {reply}");

    send(&h, JUDGE, "1").await;
    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.status, CommitmentStatus::Completed);
    assert_eq!(h.payments.refunds(), vec![("pi_a".to_owned(), 75)]);
}

#[tokio::test]
async fn undo_restores_the_penalty_within_the_window() {
    let h = harness().await;
    let commitment = seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;
    let log = pending_log_today(&h, &commitment).await;
    send(&h, JUDGE, "NO").await;

    let reply = send(&h, JUDGE, "UNDO").await;
    assert!(reply.contains("$5 penalty was restored"), "got: {reply}");

    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.stake_remaining, 50);
    let log = h
        .state
        .logs()
        .get_by_id(&log.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(log.outcome, LogOutcome::Pending);

    // The ledger keeps both sides of the story.
    let payouts = h
        .state
        .payouts()
        .list_by_commitment(&commitment.id)
        .await
        .expect("payouts");
    let amounts: Vec<i64> = payouts.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![5, -5]);

    // One undo per verification.
    let reply = send(&h, JUDGE, "UNDO").await;
    assert!(reply.contains("Nothing to undo"), "got: {reply}");

    // And the judge can hand down a fresh verdict.
    let reply = send(&h, JUDGE, "YES").await;
    assert!(reply.contains("Recorded as a PASS"), "got: {reply}");
}

#[tokio::test]
async fn undo_expires_after_the_window() {
    let h = harness().await;
    let commitment = seed_active_daily(&h, COMMITTER, Some("Sam"), 50, 5, "pi_a").await;
    pending_log_today(&h, &commitment).await;
    send(&h, JUDGE, "NO").await;

    // Age the entry past the five-minute window.
    let stale = (Utc::now() - chrono::Duration::minutes(10)).to_rfc3339();
    sqlx::query("UPDATE undo_entry SET created_at = ?1")
        .bind(&stale)
        .execute(h.state.db.as_ref())
        .await
        .expect("backdate");

    let reply = send(&h, JUDGE, "UNDO").await;
    assert!(reply.contains("Too late to undo"), "got: {reply}");
    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.stake_remaining, 45);
}

#[tokio::test]
async fn settled_commitments_cannot_be_undone() {
    let h = harness().await;
    let commitment = seed_active_deadline(&h, COMMITTER, 75, "pi_a").await;
    pending_log_today(&h, &commitment).await;

    // A deadline fail settles immediately.
    send(&h, JUDGE, "NO").await;
    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.status, CommitmentStatus::Completed);

    let reply = send(&h, JUDGE, "UNDO").await;
    assert!(reply.contains("already been settled"), "got: {reply}");
}
