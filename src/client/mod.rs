//! Authenticated HTTP client.
//!
//! Every call runs through the same pipeline: the request stage attaches
//! the stored access token unless the endpoint is public; the response stage
//! turns a first-attempt 401 into a single-flight refresh followed by one
//! replay, and normalizes every other failure into [`ApiError`].

pub mod refresh;
pub mod request;

pub use request::{ApiResponse, Attempt, RequestContext};

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{is_public_endpoint, is_refresh_endpoint, RefreshGate, Ticket, TokenStore};
use crate::config::ClientConfig;
use crate::error::{normalize_body, ApiError, Result, WaybillError};
use crate::util::timeout::with_timeout;

/// Cheaply cloneable handle; clones share the token store and refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    gate: Arc<RefreshGate>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.inner.config.api_root())
            .field("timeout", &self.inner.config.timeout)
            .field("refreshing", &self.inner.gate.is_refreshing())
            .finish()
    }
}

/// Raw transport result before the response stage classifies it.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RawResponse {
    pub(crate) fn to_api_error(&self) -> ApiError {
        normalize_body(Some(&self.body), Some(self.status.as_u16()))
    }

    fn into_result(self) -> Result<ApiResponse> {
        if self.status.is_success() || self.status.is_redirection() {
            Ok(ApiResponse {
                status: self.status,
                headers: self.headers,
                body: self.body,
            })
        } else {
            Err(WaybillError::Api(self.to_api_error()))
        }
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        config.validate()?;
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                store,
                gate: RefreshGate::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn gate(&self) -> &Arc<RefreshGate> {
        &self.inner.gate
    }

    /// Request stage: attach `Authorization: Bearer <access token>` to
    /// protected requests. Public requests are returned unchanged.
    pub async fn authorize(&self, request: RequestContext) -> Result<RequestContext> {
        if is_public_endpoint(&request.path) {
            return Ok(request);
        }
        match self.inner.store.access_token().await? {
            Some(token) if !token.is_empty() => Ok(request.with_bearer(&token)),
            _ => Ok(request),
        }
    }

    /// Run a request through the full pipeline.
    pub async fn send(&self, request: RequestContext) -> Result<ApiResponse> {
        let request = self.authorize(request).await?;
        let raw = self.dispatch(&request).await?;
        if raw.status == StatusCode::UNAUTHORIZED && request.attempt == Attempt::First {
            return self.recover_unauthorized(request, raw).await;
        }
        raw.into_result()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(RequestContext::get(path)).await?.json()
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(RequestContext::post(path).with_json(body)?)
            .await?
            .json()
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(RequestContext::put(path).with_json(body)?)
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(RequestContext::delete(path)).await
    }

    /// Response stage for a first-attempt 401.
    async fn recover_unauthorized(
        &self,
        request: RequestContext,
        raw: RawResponse,
    ) -> Result<ApiResponse> {
        let error = raw.to_api_error();

        if is_refresh_endpoint(&request.path) {
            tracing::warn!(status = error.status_code, "refresh endpoint rejected the session");
            self.teardown_session().await;
            self.inner.gate.fail_all(error.clone());
            return Err(WaybillError::RefreshFailed(error));
        }

        if is_public_endpoint(&request.path) {
            return Err(WaybillError::Api(error));
        }

        // The store already holds a newer token than the one this request
        // carried: a refresh finished while it was in flight.
        if let Some(current) = self.inner.store.access_token().await? {
            if !current.is_empty() && request.bearer() != Some(current.as_str()) {
                tracing::debug!(path = %request.path, "stale token rejected, replaying");
                return self.replay(&request, &current).await;
            }
        }

        match self.inner.gate.acquire_or_enqueue() {
            Ticket::Waiter(waiter) => match waiter.wait().await {
                Ok(token) => self.replay(&request, &token).await,
                Err(err) => Err(WaybillError::RefreshFailed(err)),
            },
            Ticket::Leader(lease) => {
                tracing::debug!(path = %request.path, "access token rejected, refreshing");
                let token = self.run_refresh(lease).await?;
                self.replay(&request, &token).await
            }
        }
    }

    /// Re-issue `request` once with `token`, bypassing the request stage.
    async fn replay(&self, request: &RequestContext, token: &str) -> Result<ApiResponse> {
        let retry = request.retry_with_token(token);
        self.dispatch(&retry).await?.into_result()
    }

    /// Send without any interceptor logic. Bounded by the configured timeout.
    pub(crate) async fn dispatch(&self, request: &RequestContext) -> Result<RawResponse> {
        let url = self.inner.config.endpoint_url(&request.path);
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        with_timeout(self.inner.config.timeout, async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            tracing::debug!(url = %url, status = status.as_u16(), "response received");
            Ok::<_, WaybillError>(RawResponse {
                status,
                headers,
                body: parse_body(&bytes),
            })
        })
        .await
    }

    /// Remove every stored credential. Failures are logged, not surfaced,
    /// so they never mask the error that caused the teardown.
    pub(crate) async fn teardown_session(&self) {
        if let Err(err) = self.inner.store.clear_all().await {
            tracing::warn!(error = %err, "failed to clear token store");
        }
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryTokenStore, StorageKey};
    use serde_json::json;

    fn client_with(store: Arc<MemoryTokenStore>) -> ApiClient {
        ApiClient::new(ClientConfig::new("http://127.0.0.1:9"), store).unwrap()
    }

    #[tokio::test]
    async fn protected_request_gets_bearer() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(StorageKey::AccessToken, "A1").await.unwrap();
        let client = client_with(store);

        let request = client
            .authorize(RequestContext::get("/sessions/current"))
            .await
            .unwrap();
        assert_eq!(request.bearer(), Some("A1"));
    }

    #[tokio::test]
    async fn public_request_passes_through() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(StorageKey::AccessToken, "A1").await.unwrap();
        let client = client_with(store);

        for path in ["/sessions", "/auth/login/", "/auth/refresh?x=1"] {
            let request = client.authorize(RequestContext::post(path)).await.unwrap();
            assert!(request.bearer().is_none(), "{path} should not carry a token");
        }
    }

    #[tokio::test]
    async fn missing_token_sends_without_header() {
        let client = client_with(Arc::new(MemoryTokenStore::new()));
        let request = client
            .authorize(RequestContext::get("/shipments"))
            .await
            .unwrap();
        assert!(request.headers.is_empty());
    }

    #[test]
    fn body_parsing_handles_empty_and_text() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(br#"{"a":1}"#), json!({ "a": 1 }));
        assert_eq!(parse_body(b"Bad Gateway"), json!("Bad Gateway"));
    }

    #[test]
    fn raw_error_response_is_normalized() {
        let raw = RawResponse {
            status: StatusCode::FORBIDDEN,
            headers: HeaderMap::new(),
            body: json!({ "error": { "message": "Forbidden", "code": "NO_ACCESS" } }),
        };
        match raw.into_result() {
            Err(WaybillError::Api(err)) => {
                assert_eq!(err, ApiError::new("Forbidden", 403).with_code("NO_ACCESS"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
