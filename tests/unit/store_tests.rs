//! Unit tests for the mapping store scan and row classification.

use oncall_topic_sync::models::work_item::ChatBackend;
use oncall_topic_sync::store;

#[tokio::test]
async fn scan_of_an_empty_store_yields_no_items() {
    let pool = store::connect_memory().await.expect("store");
    let items = store::scan(&pool).await.expect("scan");
    assert!(items.is_empty());
}

#[tokio::test]
async fn slack_rows_become_slack_items_with_split_channels() {
    let pool = store::connect_memory().await.expect("store");
    store::upsert_mapping(&pool, "SCHED1", Some("C1 C2"), None)
        .await
        .expect("upsert");

    let items = store::scan(&pool).await.expect("scan");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].schedule_id, "SCHED1");
    assert_eq!(items[0].backend, ChatBackend::Slack);
    assert_eq!(items[0].channels, vec!["C1".to_owned(), "C2".to_owned()]);
}

#[tokio::test]
async fn hipchat_rows_become_hipchat_items() {
    let pool = store::connect_memory().await.expect("store");
    store::upsert_mapping(&pool, "SCHED1", None, Some("lobby"))
        .await
        .expect("upsert");

    let items = store::scan(&pool).await.expect("scan");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].backend, ChatBackend::Hipchat);
    assert_eq!(items[0].channels, vec!["lobby".to_owned()]);
}

#[tokio::test]
async fn slack_wins_when_both_targets_are_configured() {
    let pool = store::connect_memory().await.expect("store");
    store::upsert_mapping(&pool, "SCHED1", Some("C1"), Some("lobby"))
        .await
        .expect("upsert");

    let items = store::scan(&pool).await.expect("scan");

    assert_eq!(items[0].backend, ChatBackend::Slack);
    assert_eq!(items[0].channels, vec!["C1".to_owned()]);
}

#[tokio::test]
async fn rows_without_targets_become_empty_noop_items() {
    let pool = store::connect_memory().await.expect("store");
    store::upsert_mapping(&pool, "SCHED1", None, None)
        .await
        .expect("upsert");

    let items = store::scan(&pool).await.expect("scan");

    assert_eq!(items.len(), 1);
    assert!(items[0].channels.is_empty());
}

#[tokio::test]
async fn rows_with_an_empty_schedule_key_are_dropped() {
    let pool = store::connect_memory().await.expect("store");
    store::upsert_mapping(&pool, "", Some("C1"), None)
        .await
        .expect("upsert");
    store::upsert_mapping(&pool, "SCHED1", Some("C2"), None)
        .await
        .expect("upsert");

    let items = store::scan(&pool).await.expect("scan");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].schedule_id, "SCHED1");
}

#[tokio::test]
async fn scan_returns_items_in_schedule_order() {
    let pool = store::connect_memory().await.expect("store");
    store::upsert_mapping(&pool, "SCHED2", Some("C2"), None)
        .await
        .expect("upsert");
    store::upsert_mapping(&pool, "SCHED1", Some("C1"), None)
        .await
        .expect("upsert");

    let items = store::scan(&pool).await.expect("scan");

    assert_eq!(items[0].schedule_id, "SCHED1");
    assert_eq!(items[1].schedule_id, "SCHED2");
}
