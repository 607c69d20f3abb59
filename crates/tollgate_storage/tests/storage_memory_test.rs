//! Tests for the in-memory key-value store.

use tollgate_storage::{KeyValueStore, MemoryStore};

#[tokio::test]
async fn test_clones_share_contents() {
    let store = MemoryStore::new();
    let other = store.clone();

    store.set("cache/one", b"hello").await.unwrap();
    assert_eq!(other.get("cache/one").await.unwrap(), Some(b"hello".to_vec()));

    other.delete("cache/one").await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_keys_with_prefix() {
    let store = MemoryStore::new();
    store.set("cache/b", b"2").await.unwrap();
    store.set("cache/a", b"1").await.unwrap();
    store.set("quota/primary/requests", b"[]").await.unwrap();

    assert_eq!(
        store.keys_with_prefix("cache/").await,
        vec!["cache/a".to_string(), "cache/b".to_string()]
    );
    assert_eq!(store.len().await, 3);
}
