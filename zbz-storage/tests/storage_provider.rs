use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use zbz_storage::{InMemoryProvider, Operation, StorageProvider};

#[tokio::test]
async fn set_then_get_round_trips() {
    let store = InMemoryProvider::new();
    store.set("k", Bytes::from_static(b"v"), None).await;
    assert_eq!(store.get("k").await, Some(Bytes::from_static(b"v")));
}

#[tokio::test]
async fn missing_key_reads_as_absent() {
    let store = InMemoryProvider::new();
    assert_eq!(store.get("nope").await, None);
    assert!(!store.exists("nope").await);
}

#[tokio::test]
async fn ttl_expires_lazily_on_read() {
    let store = InMemoryProvider::new();
    store.set("k", Bytes::from_static(b"v"), Some(Duration::from_millis(10))).await;
    assert!(store.exists("k").await);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(store.get("k").await, None);
}

#[tokio::test]
async fn list_returns_keys_matching_prefix() {
    let store = InMemoryProvider::new();
    store.set("user/1", Bytes::from_static(b"a"), None).await;
    store.set("user/2", Bytes::from_static(b"b"), None).await;
    store.set("order/1", Bytes::from_static(b"c"), None).await;

    let mut keys = store.list("user/").await;
    keys.sort();
    assert_eq!(keys, vec!["user/1", "user/2"]);
}

#[tokio::test]
async fn set_on_new_key_emits_create_then_update_on_overwrite() {
    let store = InMemoryProvider::new();
    let events = Arc::new(Mutex::new(Vec::new()));

    let e = events.clone();
    store.subscribe(
        "k",
        Arc::new(move |event| {
            e.lock().unwrap().push(event.operation);
        }),
    );

    store.set("k", Bytes::from_static(b"1"), None).await;
    store.set("k", Bytes::from_static(b"2"), None).await;

    assert_eq!(*events.lock().unwrap(), vec![Operation::Create, Operation::Update]);
}

#[tokio::test]
async fn delete_emits_a_change_event_only_when_key_existed() {
    let store = InMemoryProvider::new();
    let count = Arc::new(AtomicUsize::new(0));

    let c = count.clone();
    store.subscribe(
        "k",
        Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    );

    store.delete("missing").await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    store.set("k", Bytes::from_static(b"v"), None).await;
    store.delete("k").await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unsubscribe_stops_further_notifications() {
    let store = InMemoryProvider::new();
    let count = Arc::new(AtomicUsize::new(0));

    let c = count.clone();
    let id = store.subscribe(
        "k",
        Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    );

    store.set("k", Bytes::from_static(b"1"), None).await;
    store.unsubscribe(id);
    store.set("k", Bytes::from_static(b"2"), None).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn filesystem_provider_round_trips_and_honors_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let store = zbz_storage::FilesystemProvider::new(dir.path());

    store.set("config.yaml", Bytes::from_static(b"name: demo"), None).await;
    assert_eq!(store.get("config.yaml").await, Some(Bytes::from_static(b"name: demo")));

    store
        .set("session.tok", Bytes::from_static(b"abc"), Some(Duration::from_millis(10)))
        .await;
    assert!(store.exists("session.tok").await);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(store.get("session.tok").await, None);
}

#[tokio::test]
async fn global_provider_errors_until_configured() {
    assert_eq!(zbz_storage::storage().unwrap_err(), zbz_storage::StorageError::NotConfigured);
    zbz_storage::configure(Arc::new(InMemoryProvider::new()));
    assert!(zbz_storage::storage().is_ok());
}
