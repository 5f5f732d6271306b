//! Integration tests for durable token storage.

use std::sync::Arc;

use chrono::DateTime;
use serde_json::json;
use tempfile::TempDir;

use waybill::auth::{FileTokenStore, StorageKey, TokenPair, TokenStore, TokenStoreConfig};

fn store_in(dir: &TempDir) -> FileTokenStore {
    FileTokenStore::new(TokenStoreConfig::new(dir.path().to_path_buf()))
}

#[tokio::test]
async fn pair_survives_a_new_store_instance() {
    let dir = TempDir::new().expect("tempdir");
    let pair = TokenPair::new("acc-123", "ref-456");
    store_in(&dir).save_tokens(&pair).await.expect("save");

    // A fresh instance over the same directory models a process restart.
    let reopened = store_in(&dir);
    assert_eq!(reopened.load_tokens().await.expect("load"), Some(pair));
    assert!(reopened.is_authenticated().await.expect("read"));
}

#[tokio::test]
async fn clear_then_read_yields_absent_for_all_keys() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_in(&dir);
    store.save_tokens(&TokenPair::new("a", "r")).await.unwrap();
    store.save_user(&json!({ "id": 1, "fullName": "Driver" })).await.unwrap();

    store.clear_all().await.unwrap();

    for key in StorageKey::ALL {
        assert_eq!(store.get(key).await.unwrap(), None, "{key}");
    }
    assert_eq!(store.load_tokens().await.unwrap(), None);
    assert!(!store.is_authenticated().await.unwrap());
}

#[tokio::test]
async fn overwrite_replaces_previous_value() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_in(&dir);
    store.save_tokens(&TokenPair::new("A1", "R1")).await.unwrap();
    store.save_tokens(&TokenPair::new("A2", "R2")).await.unwrap();
    assert_eq!(
        store.load_tokens().await.unwrap(),
        Some(TokenPair::new("A2", "R2"))
    );
}

#[tokio::test]
async fn corrupt_entry_is_a_serialization_error() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("access_token.toml"), "not = [valid").unwrap();
    let store = store_in(&dir);
    let err = store.get(StorageKey::AccessToken).await.unwrap_err();
    assert!(matches!(err, waybill::auth::StoreError::Serialization(_)));
}

#[tokio::test]
async fn expiry_is_restored_after_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let expires_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let pair = TokenPair::new("A1", "R1").with_expiry(Some(expires_at));
    store_in(&dir).save_tokens(&pair).await.unwrap();

    let loaded = store_in(&dir).load_tokens().await.unwrap();
    assert_eq!(loaded, Some(pair));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reads_never_observe_a_half_written_entry() {
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(store_in(&dir));
    store.set(StorageKey::AccessToken, "A0").await.unwrap();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 1..=300 {
                store
                    .set(StorageKey::AccessToken, &format!("A{i}"))
                    .await
                    .unwrap();
            }
        })
    };

    loop {
        let done = writer.is_finished();
        let value = store
            .get(StorageKey::AccessToken)
            .await
            .expect("read during write");
        assert!(value.is_some_and(|v| v.starts_with('A')));
        if done {
            break;
        }
    }
    writer.await.unwrap();

    assert_eq!(
        store.get(StorageKey::AccessToken).await.unwrap().as_deref(),
        Some("A300")
    );
}
