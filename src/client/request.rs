//! Request and response values flowing through the pipeline.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, WaybillError};

/// Which pass through the pipeline a request is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Original call. A 401 here may trigger a refresh.
    First,
    /// Replay after a refresh. A 401 here is surfaced as-is.
    Retry,
}

/// Outbound request descriptor.
///
/// Paths are relative to the API root (`/sessions/current`), optionally
/// with a query string. Values are immutable in spirit: the builder methods
/// consume and return `Self`, and a replay is a new value.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub attempt: Attempt,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            attempt: Attempt::First,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set `Authorization: Bearer <token>`, replacing any existing value.
    pub fn with_bearer(mut self, token: &str) -> Self {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!(
                    path = %self.path,
                    "access token is not a valid header value, sending without it"
                );
            }
        }
        self
    }

    /// A replay of this request carrying a freshly issued token.
    pub fn retry_with_token(&self, token: &str) -> Self {
        let mut retry = self.clone().with_bearer(token);
        retry.attempt = Attempt::Retry;
        retry
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }
}

/// A successful (2xx/3xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body; `Null` when empty, a string when not JSON.
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(WaybillError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bearer_header_has_exact_format() {
        let request = RequestContext::get("/shipments").with_bearer("A1");
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer A1"
        );
        assert_eq!(request.bearer(), Some("A1"));
    }

    #[test]
    fn retry_is_a_distinct_value() {
        let original = RequestContext::post("/shipments")
            .with_body(json!({ "id": 1 }))
            .with_bearer("OLD");
        let retry = original.retry_with_token("NEW");

        assert_eq!(original.attempt, Attempt::First);
        assert_eq!(original.bearer(), Some("OLD"));
        assert_eq!(retry.attempt, Attempt::Retry);
        assert_eq!(retry.bearer(), Some("NEW"));
        assert_eq!(retry.body, original.body);
        assert_eq!(retry.method, Method::POST);
    }

    #[test]
    fn invalid_token_is_not_attached() {
        let request = RequestContext::get("/x").with_bearer("bad\ntoken");
        assert!(request.bearer().is_none());
    }
}
