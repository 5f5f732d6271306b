#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use waybill::auth::{MemoryTokenStore, StorageKey, StoreError, TokenPair, TokenStore};
use waybill::client::ApiClient;
use waybill::config::ClientConfig;
use wiremock::MockServer;

pub const API_PREFIX: &str = "/api/v1";

pub fn api_path(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

pub async fn seeded_store(access: &str, refresh: &str) -> Arc<MemoryTokenStore> {
    let store = Arc::new(MemoryTokenStore::new());
    store
        .save_tokens(&TokenPair::new(access, refresh))
        .await
        .expect("seed store");
    store
}

pub fn client_for(server: &MockServer, store: Arc<dyn TokenStore>) -> ApiClient {
    client_with_timeout(server, store, Duration::from_secs(5))
}

pub fn client_with_timeout(
    server: &MockServer,
    store: Arc<dyn TokenStore>,
    timeout: Duration,
) -> ApiClient {
    let config = ClientConfig::new(server.uri()).with_timeout(timeout);
    ApiClient::new(config, store).expect("build client")
}

pub async fn assert_store_empty(store: &dyn TokenStore) {
    for key in StorageKey::ALL {
        assert!(
            store.get(key).await.expect("store read").is_none(),
            "{key} should have been cleared"
        );
    }
}

/// Bearer tokens seen by the server on requests to `path`, in arrival order.
pub async fn bearers_for(server: &MockServer, path: &str) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|req| req.url.path() == path)
        .map(|req| {
            req.headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}

/// Store whose reads always fail.
#[derive(Default)]
pub struct BrokenStore;

#[async_trait]
impl TokenStore for BrokenStore {
    async fn get(&self, _key: StorageKey) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("keychain locked".to_string()))
    }

    async fn set(&self, _key: StorageKey, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("keychain locked".to_string()))
    }

    async fn delete(&self, _key: StorageKey) -> Result<(), StoreError> {
        Ok(())
    }
}
