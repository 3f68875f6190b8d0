use std::sync::Arc;

use chrono::NaiveDate;
use stakemate::models::commitment::{
    Commitment, CommitmentStatus, CommitmentType, RefundStatus,
};
use stakemate::persistence::commitment_repo::CommitmentRepo;
use stakemate::persistence::db;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn daily_commitment(phone: &str) -> Commitment {
    Commitment::new(
        phone.to_owned(),
        Some("Sam".to_owned()),
        "run every morning".to_owned(),
        CommitmentType::Daily,
        "America/Los_Angeles".to_owned(),
        date(2026, 8, 24),
        date(2026, 9, 2),
        None,
        100,
        10,
        "+15557770000".to_owned(),
        "Jo".to_owned(),
        "pi_test_1".to_owned(),
    )
}

async fn repo() -> CommitmentRepo {
    let db = db::connect_memory().await.expect("db connect");
    CommitmentRepo::new(Arc::new(db))
}

#[tokio::test]
async fn create_and_get_round_trip() {
    let repo = repo().await;
    let created = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");

    let fetched = repo
        .get_by_id(&created.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched, created);
    assert_eq!(fetched.status, CommitmentStatus::AwaitingJudge);
    assert_eq!(fetched.stake_remaining, 100);

    assert!(repo.get_by_id("nope").await.expect("get").is_none());
}

#[tokio::test]
async fn activate_is_single_use() {
    let repo = repo().await;
    let c = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");

    assert!(repo.activate(&c.id).await.expect("activate"));
    // Already active: the conditional update matches nothing.
    assert!(!repo.activate(&c.id).await.expect("activate again"));

    let fetched = repo.get_by_id(&c.id).await.expect("get").expect("present");
    assert_eq!(fetched.status, CommitmentStatus::Active);
}

#[tokio::test]
async fn decline_only_applies_while_awaiting() {
    let repo = repo().await;
    let c = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");

    assert!(repo.mark_declined(&c.id).await.expect("decline"));
    assert!(!repo.mark_declined(&c.id).await.expect("decline again"));

    let fetched = repo.get_by_id(&c.id).await.expect("get").expect("present");
    assert_eq!(fetched.status, CommitmentStatus::JudgeDeclined);
    // A declined commitment cannot be activated either.
    assert!(!repo.activate(&c.id).await.expect("activate"));
}

#[tokio::test]
async fn complete_wins_exactly_once() {
    let repo = repo().await;
    let c = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");
    repo.activate(&c.id).await.expect("activate");

    assert!(repo.complete(&c.id).await.expect("complete"));
    assert!(!repo.complete(&c.id).await.expect("complete again"));

    let fetched = repo.get_by_id(&c.id).await.expect("get").expect("present");
    assert_eq!(fetched.status, CommitmentStatus::Completed);
}

#[tokio::test]
async fn open_and_active_lookups() {
    let repo = repo().await;
    let c = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");

    // Awaiting-judge counts as open but not active.
    assert!(repo
        .get_open_by_phone("+15551110000")
        .await
        .expect("open")
        .is_some());
    assert!(repo
        .get_active_by_phone("+15551110000")
        .await
        .expect("active")
        .is_none());

    repo.activate(&c.id).await.expect("activate");
    assert!(repo
        .get_active_by_phone("+15551110000")
        .await
        .expect("active")
        .is_some());
    assert_eq!(repo.list_active().await.expect("list").len(), 1);

    repo.complete(&c.id).await.expect("complete");
    assert!(repo
        .get_open_by_phone("+15551110000")
        .await
        .expect("open")
        .is_none());
    assert!(repo.list_active().await.expect("list").is_empty());
    assert_eq!(
        repo.list_completed_by_phone("+15551110000", 5)
            .await
            .expect("completed")
            .len(),
        1
    );
}

#[tokio::test]
async fn adjust_stake_clamps_to_bounds() {
    let repo = repo().await;
    let c = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");

    repo.set_stake_remaining(&c.id, 20).await.expect("set");
    // An undo larger than what was ever debited still caps at the
    // original stake.
    repo.adjust_stake(&c.id, 500).await.expect("adjust");
    let fetched = repo.get_by_id(&c.id).await.expect("get").expect("present");
    assert_eq!(fetched.stake_remaining, 100);

    repo.adjust_stake(&c.id, -500).await.expect("adjust");
    let fetched = repo.get_by_id(&c.id).await.expect("get").expect("present");
    assert_eq!(fetched.stake_remaining, 0);
}

#[tokio::test]
async fn refund_bookkeeping_and_report_query() {
    let repo = repo().await;
    let c = repo
        .create(&daily_commitment("+15551110000"))
        .await
        .expect("create");
    repo.activate(&c.id).await.expect("activate");
    repo.complete(&c.id).await.expect("complete");

    // Completed with stake held and no refund recorded: flagged.
    assert_eq!(repo.list_unrefunded().await.expect("list").len(), 1);

    repo.set_refund(&c.id, RefundStatus::Failed, 100, Some("gateway down"))
        .await
        .expect("set refund");
    // A failed refund stays on the report.
    assert_eq!(repo.list_unrefunded().await.expect("list").len(), 1);

    repo.set_refund(&c.id, RefundStatus::Refunded, 100, None)
        .await
        .expect("set refund");
    assert!(repo.list_unrefunded().await.expect("list").is_empty());

    let fetched = repo.get_by_id(&c.id).await.expect("get").expect("present");
    assert_eq!(fetched.refund_status, Some(RefundStatus::Refunded));
    assert_eq!(fetched.refund_amount, Some(100));
    assert_eq!(fetched.refund_error, None);
}
