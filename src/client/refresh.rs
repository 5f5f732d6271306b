//! Refresh-token exchange performed by the refresh gate's leader.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{ApiClient, RequestContext};
use crate::auth::{RefreshLease, TokenPair, REFRESH_ENDPOINT};
use crate::error::normalize::scalar_to_string;
use crate::error::{ApiError, Result, WaybillError};

impl ApiClient {
    /// Run the refresh as gate leader and publish the outcome.
    ///
    /// On success the new pair is persisted and waiters receive the new
    /// access token. On any failure the token store is cleared and waiters
    /// are rejected. The gate is idle again when this returns, including
    /// when the future is dropped part-way.
    pub(crate) async fn run_refresh(&self, lease: RefreshLease) -> Result<String> {
        match self.exchange_refresh_token().await {
            Ok(pair) => {
                tracing::debug!("access token refreshed");
                lease.release(Ok(pair.access_token.clone()));
                Ok(pair.access_token)
            }
            Err(err) => {
                let error = match err {
                    WaybillError::RefreshFailed(error) => error,
                    other => other.to_api_error(),
                };
                tracing::warn!(error = %error, "token refresh failed, clearing session");
                self.teardown_session().await;
                lease.release(Err(error.clone()));
                Err(WaybillError::RefreshFailed(error))
            }
        }
    }

    /// Exchange the stored refresh token for a new pair and persist it.
    ///
    /// The call bypasses the request stage, so it carries no bearer token and
    /// its own 401 never re-enters the refresh path.
    async fn exchange_refresh_token(&self) -> Result<TokenPair> {
        let refresh_token = self
            .store()
            .refresh_token()
            .await?
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                WaybillError::RefreshFailed(ApiError::new("No refresh token available", 401))
            })?;

        let request = RequestContext::post(REFRESH_ENDPOINT)
            .with_body(json!({ "refreshToken": refresh_token }));
        let raw = self.dispatch(&request).await?;
        if !raw.status.is_success() {
            return Err(WaybillError::RefreshFailed(raw.to_api_error()));
        }

        let pair = parse_refresh_payload(&raw.body)?;
        self.store().save_tokens(&pair).await?;
        Ok(pair)
    }
}

/// Extract a token pair from a refresh (or login) response.
///
/// Accepts both the `{ success, data }` envelope and the bare token
/// payload. Token fields must be non-empty strings or scalars; anything
/// else (missing, null, empty, objects) is rejected rather than stringified.
pub fn parse_refresh_payload(body: &Value) -> Result<TokenPair> {
    let data = match (body.get("success"), body.get("data")) {
        (Some(Value::Bool(true)), Some(data)) if !data.is_null() => data,
        _ => body,
    };

    let access_token = coerce_token(data.get("accessToken"));
    let refresh_token = coerce_token(data.get("refreshToken"));
    let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) else {
        return Err(WaybillError::InvalidResponse(
            "Invalid tokens received from refresh endpoint".to_string(),
        ));
    };

    let expires_at = data
        .get("accessTokenExpiredAt")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    Ok(TokenPair::new(access_token, refresh_token).with_expiry(expires_at))
}

fn coerce_token(value: Option<&Value>) -> Option<String> {
    value
        .and_then(scalar_to_string)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn enveloped_payload_is_unwrapped() {
        let body = json!({
            "success": true,
            "data": {
                "accessToken": "A2",
                "refreshToken": "R2",
                "accessTokenExpiredAt": 1700000000
            }
        });
        let pair = parse_refresh_payload(&body).unwrap();
        assert_eq!(pair.access_token, "A2");
        assert_eq!(pair.refresh_token, "R2");
        assert_eq!(pair.expires_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn raw_payload_is_accepted() {
        let body = json!({ "accessToken": "A3", "refreshToken": "R3" });
        assert_eq!(parse_refresh_payload(&body).unwrap(), TokenPair::new("A3", "R3"));
    }

    #[test]
    fn numeric_tokens_are_stringified() {
        let body = json!({ "accessToken": 12345, "refreshToken": "R" });
        assert_eq!(parse_refresh_payload(&body).unwrap().access_token, "12345");
    }

    #[test]
    fn missing_null_or_empty_tokens_are_rejected() {
        for body in [
            json!({ "success": true, "data": { "refreshToken": "R" } }),
            json!({ "accessToken": null, "refreshToken": "R" }),
            json!({ "accessToken": "", "refreshToken": "R" }),
            json!({ "accessToken": { "value": "A" }, "refreshToken": "R" }),
            json!({ "success": false, "data": null }),
        ] {
            assert!(
                matches!(parse_refresh_payload(&body), Err(WaybillError::InvalidResponse(_))),
                "{body} should be rejected"
            );
        }
    }
}
