//! Deterministic scheduler ticks: dispatch, reminder escalation, the
//! timeout default, the termination sweep, and the refund report.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;

use stakemate::models::commitment::{Commitment, CommitmentStatus, CommitmentType, RefundStatus};
use stakemate::models::daily_log::{DailyLog, LogOutcome};
use stakemate::models::judge::{ConsentStatus, JudgeRecord};
use stakemate::scheduler::Scheduler;

use super::test_helpers::{harness, TestHarness, COMMITTER, JUDGE, TZ};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// A fixed instant expressed in the committer's local clock.
fn local(y: i32, m: u32, d: u32, hour: u32) -> DateTime<Utc> {
    Los_Angeles
        .with_ymd_and_hms(y, m, d, hour, 0, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

/// Seed an active commitment with explicit dates, past or future.
async fn seed_dated(
    h: &TestHarness,
    kind: CommitmentType,
    start: NaiveDate,
    end: NaiveDate,
    stake: i64,
    penalty: i64,
) -> Commitment {
    let deadline = match kind {
        CommitmentType::Daily => None,
        CommitmentType::Deadline => Some(end),
    };
    let commitment = Commitment::new(
        COMMITTER.to_owned(),
        Some("Sam".to_owned()),
        "run every morning".to_owned(),
        kind,
        TZ.to_owned(),
        start,
        end,
        deadline,
        stake,
        penalty,
        JUDGE.to_owned(),
        "Jo".to_owned(),
        "pi_seed".to_owned(),
    );
    let commitment = h
        .state
        .commitments()
        .create(&commitment)
        .await
        .expect("create");
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
    commitment
}

#[tokio::test]
async fn check_in_dispatches_once_at_the_evening_hour() {
    let h = harness().await;
    let commitment = seed_dated(
        &h,
        CommitmentType::Daily,
        date(2026, 3, 2),
        date(2026, 3, 11),
        50,
        5,
    )
    .await;
    let mut scheduler = Scheduler::new(h.state.clone());

    // Too early in the day: nothing goes out.
    scheduler.tick(local(2026, 3, 2, 19)).await.expect("tick");
    assert!(h.sms.sent_to(JUDGE).is_empty());

    scheduler.tick(local(2026, 3, 2, 20)).await.expect("tick");
    let questions = h.sms.sent_to(JUDGE);
    assert_eq!(questions.len(), 1);
    assert!(
        questions[0].contains("did Sam do \"run every morning\""),
        "got: {}",
        questions[0]
    );

    // The committer gets the day's status line alongside.
    let status = h.sms.sent_to(COMMITTER);
    assert_eq!(status.len(), 1);
    assert!(status[0].contains("Day 1 of 10"), "got: {}", status[0]);

    // A repeated tick in the same hour finds the log and stays quiet.
    scheduler.tick(local(2026, 3, 2, 20)).await.expect("tick");
    assert_eq!(h.sms.sent_to(JUDGE).len(), 1);
    assert_eq!(h.sms.sent_to(COMMITTER).len(), 1);

    let logs = h
        .state
        .logs()
        .list_by_commitment(&commitment.id)
        .await
        .expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].date, date(2026, 3, 2));
}

#[tokio::test]
async fn nothing_dispatches_before_the_start_date() {
    let h = harness().await;
    seed_dated(
        &h,
        CommitmentType::Daily,
        date(2026, 3, 5),
        date(2026, 3, 14),
        50,
        5,
    )
    .await;
    let mut scheduler = Scheduler::new(h.state.clone());

    scheduler.tick(local(2026, 3, 4, 20)).await.expect("tick");
    assert!(h.sms.sent_to(JUDGE).is_empty());

    scheduler.tick(local(2026, 3, 5, 20)).await.expect("tick");
    assert_eq!(h.sms.sent_to(JUDGE).len(), 1);
}

#[tokio::test]
async fn reminders_escalate_and_the_timeout_defaults_to_fail() {
    let h = harness().await;
    let commitment = seed_dated(
        &h,
        CommitmentType::Daily,
        date(2026, 3, 2),
        date(2026, 3, 11),
        50,
        5,
    )
    .await;
    h.state
        .logs()
        .create(&DailyLog::new(commitment.id.clone(), date(2026, 3, 2)))
        .await
        .expect("create log");
    let mut scheduler = Scheduler::new(h.state.clone());

    // Two hours after the 8pm dispatch: first nudge.
    scheduler.tick(local(2026, 3, 2, 22)).await.expect("tick");
    let sent = h.sms.sent_to(JUDGE);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Still waiting"), "got: {}", sent[0]);

    // Same hour again: the stage guard keeps it to one nudge.
    scheduler.tick(local(2026, 3, 2, 22)).await.expect("tick");
    assert_eq!(h.sms.sent_to(JUDGE).len(), 1);

    // Next morning: last call.
    scheduler.tick(local(2026, 3, 3, 9)).await.expect("tick");
    let sent = h.sms.sent_to(JUDGE);
    assert_eq!(sent.len(), 2);
    assert!(sent[1].contains("Last call"), "got: {}", sent[1]);

    // Noon next day: the unanswered log counts as a miss.
    scheduler.tick(local(2026, 3, 3, 12)).await.expect("tick");
    let logs = h
        .state
        .logs()
        .list_by_commitment(&commitment.id)
        .await
        .expect("logs");
    assert_eq!(logs[0].outcome, LogOutcome::Fail);
    assert_eq!(logs[0].judge_verified, Some(false));

    let commitment = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(commitment.stake_remaining, 45);
    let notes = h.sms.sent_to(COMMITTER);
    assert!(
        notes
            .iter()
            .any(|m| m.contains("No verification arrived in time")),
        "got: {notes:?}"
    );
}

#[tokio::test]
async fn elapsed_commitments_are_swept_and_refunded() {
    let h = harness().await;
    let commitment = seed_dated(
        &h,
        CommitmentType::Daily,
        date(2026, 3, 2),
        date(2026, 3, 11),
        50,
        5,
    )
    .await;
    h.state
        .commitments()
        .set_stake_remaining(&commitment.id, 40)
        .await
        .expect("set stake");
    let mut scheduler = Scheduler::new(h.state.clone());

    // The day after the end date, with no logs outstanding.
    scheduler.tick(local(2026, 3, 12, 8)).await.expect("tick");

    let commitment = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(commitment.status, CommitmentStatus::Completed);
    assert_eq!(commitment.refund_status, Some(RefundStatus::Refunded));
    assert_eq!(h.payments.refunds(), vec![("pi_seed".to_owned(), 40)]);
}

#[tokio::test]
async fn settlement_waits_for_outstanding_logs() {
    let h = harness().await;
    let commitment = seed_dated(
        &h,
        CommitmentType::Daily,
        date(2026, 3, 2),
        date(2026, 3, 11),
        50,
        5,
    )
    .await;
    h.state
        .logs()
        .create(&DailyLog::new(commitment.id.clone(), date(2026, 3, 11)))
        .await
        .expect("create log");
    let mut scheduler = Scheduler::new(h.state.clone());

    // Past the end date but the final log is pending and the timeout
    // hour has not arrived: still active.
    scheduler.tick(local(2026, 3, 12, 8)).await.expect("tick");
    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.status, CommitmentStatus::Active);

    // The timeout resolves the log; the next tick sweeps.
    scheduler.tick(local(2026, 3, 12, 12)).await.expect("tick");
    scheduler.tick(local(2026, 3, 12, 13)).await.expect("tick");
    let fetched = h
        .state
        .commitments()
        .get_by_id(&commitment.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.status, CommitmentStatus::Completed);
    assert_eq!(fetched.stake_remaining, 45);
}

#[tokio::test]
async fn deadline_check_in_goes_out_on_the_deadline_only() {
    let h = harness().await;
    seed_dated(
        &h,
        CommitmentType::Deadline,
        date(2026, 3, 2),
        date(2026, 3, 9),
        75,
        75,
    )
    .await;
    let mut scheduler = Scheduler::new(h.state.clone());

    scheduler.tick(local(2026, 3, 5, 20)).await.expect("tick");
    assert!(h.sms.sent_to(JUDGE).is_empty());

    scheduler.tick(local(2026, 3, 9, 20)).await.expect("tick");
    let sent = h.sms.sent_to(JUDGE);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("deadline"), "got: {}", sent[0]);
}

#[tokio::test]
async fn stuck_refunds_are_reported_once_a_day() {
    let h = harness().await;
    let commitment = seed_dated(
        &h,
        CommitmentType::Daily,
        date(2026, 3, 2),
        date(2026, 3, 11),
        50,
        5,
    )
    .await;
    h.state
        .commitments()
        .complete(&commitment.id)
        .await
        .expect("complete");
    h.state
        .commitments()
        .set_refund(&commitment.id, RefundStatus::Failed, 50, Some("gateway down"))
        .await
        .expect("set refund");
    let mut scheduler = Scheduler::new(h.state.clone());

    scheduler.tick(local(2026, 3, 12, 9)).await.expect("tick");
    let reports = h.sms.sent_to("+15550000001");
    assert_eq!(reports.len(), 1);
    assert!(
        reports[0].contains("refund(s) need attention") && reports[0].contains("gateway down"),
        "got: {}",
        reports[0]
    );

    // Later the same day: no repeat.
    scheduler.tick(local(2026, 3, 12, 9)).await.expect("tick");
    assert_eq!(h.sms.sent_to("+15550000001").len(), 1);

    // The next morning it fires again while the refund stays stuck.
    scheduler.tick(local(2026, 3, 13, 9)).await.expect("tick");
    assert_eq!(h.sms.sent_to("+15550000001").len(), 2);
}
