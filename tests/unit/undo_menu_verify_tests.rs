use std::sync::Arc;

use chrono::{Duration, Utc};
use stakemate::models::daily_log::LogOutcome;
use stakemate::persistence::db;
use stakemate::persistence::menu_repo::{MenuChoice, MenuRepo};
use stakemate::persistence::undo_repo::UndoRepo;
use stakemate::persistence::verify_repo::VerifyRepo;

const JUDGE: &str = "+15557770000";

fn choice(n: u32) -> MenuChoice {
    MenuChoice {
        commitment_id: format!("c{n}"),
        log_id: Some(format!("log{n}")),
        committer_phone: format!("+1555111000{n}"),
        label: format!("…000{n}"),
        commitment_text: "run every morning".to_owned(),
    }
}

#[tokio::test]
async fn undo_latest_and_consume_once() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = UndoRepo::new(Arc::clone(&db));

    repo.record(JUDGE, "c1", "log1", LogOutcome::Fail, 10)
        .await
        .expect("record");
    // Later entries shadow earlier ones.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    repo.record(JUDGE, "c1", "log2", LogOutcome::Pass, 0)
        .await
        .expect("record");

    let latest = repo.latest(JUDGE).await.expect("latest").expect("present");
    assert_eq!(latest.log_id, "log2");
    assert_eq!(latest.prior_outcome, LogOutcome::Pass);
    assert_eq!(latest.monetary_delta, 0);

    assert!(repo.consume(&latest.id).await.expect("consume"));
    assert!(!repo.consume(&latest.id).await.expect("consume again"));

    // With the newest gone, the earlier entry surfaces.
    let next = repo.latest(JUDGE).await.expect("latest").expect("present");
    assert_eq!(next.log_id, "log1");
    assert_eq!(next.monetary_delta, 10);

    assert!(repo.latest("+15559990000").await.expect("latest").is_none());
}

#[tokio::test]
async fn undo_entries_age_out() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = UndoRepo::new(Arc::clone(&db));

    repo.record(JUDGE, "c1", "log1", LogOutcome::Fail, 10)
        .await
        .expect("record");

    repo.purge_older_than(Utc::now() - Duration::minutes(5))
        .await
        .expect("purge");
    assert!(repo.latest(JUDGE).await.expect("latest").is_some());

    repo.purge_older_than(Utc::now() + Duration::seconds(1))
        .await
        .expect("purge");
    assert!(repo.latest(JUDGE).await.expect("latest").is_none());
}

#[tokio::test]
async fn menu_sessions_are_superseded_and_single_use() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = MenuRepo::new(Arc::clone(&db));
    let expires = Utc::now() + Duration::minutes(10);

    let first = repo
        .create(JUDGE, &[choice(1)], expires)
        .await
        .expect("create");
    let second = repo
        .create(JUDGE, &[choice(1), choice(2)], expires)
        .await
        .expect("create again");

    // Only the newest session answers.
    let active = repo
        .get_active(JUDGE)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(active.id, second.id);
    assert_eq!(active.choices.len(), 2);
    assert!(!repo.deactivate(&first.id).await.expect("deactivate old"));

    assert!(repo.deactivate(&second.id).await.expect("deactivate"));
    assert!(!repo.deactivate(&second.id).await.expect("deactivate again"));
    assert!(repo.get_active(JUDGE).await.expect("get").is_none());
}

#[tokio::test]
async fn expired_menus_do_not_answer() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = MenuRepo::new(Arc::clone(&db));

    repo.create(JUDGE, &[choice(1)], Utc::now() - Duration::minutes(1))
        .await
        .expect("create");
    assert!(repo.get_active(JUDGE).await.expect("get").is_none());

    repo.purge_expired().await.expect("purge");
    // A fresh session after the sweep works normally.
    repo.create(JUDGE, &[choice(1)], Utc::now() + Duration::minutes(10))
        .await
        .expect("create");
    assert!(repo.get_active(JUDGE).await.expect("get").is_some());
}

#[tokio::test]
async fn verify_codes_are_single_use() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = VerifyRepo::new(Arc::clone(&db));
    let expires = Utc::now() + Duration::minutes(10);

    repo.put("+15551110000", "0420", expires).await.expect("put");

    assert!(!repo.take("+15551110000", "9999").await.expect("wrong code"));
    assert!(!repo.take("+15559990000", "0420").await.expect("wrong phone"));
    // The wrong guesses above must not burn the code.
    assert!(repo.take("+15551110000", "0420").await.expect("take"));
    assert!(!repo.take("+15551110000", "0420").await.expect("take again"));
}

#[tokio::test]
async fn verify_codes_expire_and_replace() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let repo = VerifyRepo::new(Arc::clone(&db));

    repo.put("+15551110000", "0420", Utc::now() - Duration::minutes(1))
        .await
        .expect("put");
    assert!(!repo.take("+15551110000", "0420").await.expect("expired"));

    // Requesting again replaces the old code for the phone.
    repo.put("+15551110000", "7777", Utc::now() + Duration::minutes(10))
        .await
        .expect("put again");
    assert!(!repo.take("+15551110000", "0420").await.expect("old code"));
    assert!(repo.take("+15551110000", "7777").await.expect("take"));

    repo.purge_expired().await.expect("purge");
}
