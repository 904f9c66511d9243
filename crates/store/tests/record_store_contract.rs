//! Behavior every record store must share, run against each backend.

use std::sync::Arc;

use cheezy_platform_core::RecordStore;
use cheezy_store::{JsonlRecordStore, MemoryRecordStore};
use serde_json::json;

async fn appends_are_visible_to_subscribers(store: Arc<dyn RecordStore>) {
    let mut sub = store.subscribe("experiences").unwrap();
    assert!(sub.next().await.unwrap().is_empty());

    let first = store
        .append("experiences", json!({ "type": "image", "url": "a", "createdAt": 1 }))
        .await
        .unwrap();
    let snapshot = sub.next().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[&first]["url"], "a");

    let second = store
        .append("experiences", json!({ "type": "video", "url": "b", "createdAt": 2 }))
        .await
        .unwrap();
    assert_ne!(first, second);
    assert!(second > first, "ids grow in append order");

    let snapshot = sub.next().await.unwrap();
    assert_eq!(snapshot.len(), 2);

    sub.unsubscribe();
    assert!(sub.next().await.is_none());
}

async fn collections_do_not_leak(store: Arc<dyn RecordStore>) {
    store.append("one", json!({ "x": 1 })).await.unwrap();
    let mut other = store.subscribe("two").unwrap();
    assert!(other.next().await.unwrap().is_empty());
}

#[tokio::test]
async fn memory_store_contract() {
    appends_are_visible_to_subscribers(Arc::new(MemoryRecordStore::new())).await;
    collections_do_not_leak(Arc::new(MemoryRecordStore::new())).await;
}

#[tokio::test]
async fn jsonl_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    appends_are_visible_to_subscribers(Arc::new(JsonlRecordStore::at_path(dir.path().join("a")).unwrap()))
        .await;
    collections_do_not_leak(Arc::new(JsonlRecordStore::at_path(dir.path().join("b")).unwrap())).await;
}
