//! Login, logout, and explicit token refresh.

use serde_json::json;

use super::types::{AuthTokens, Envelope, LoginRequest};
use crate::auth::{TokenPair, REFRESH_ENDPOINT};
use crate::client::{ApiClient, RequestContext};
use crate::error::Result;

pub const SESSIONS_ENDPOINT: &str = "/sessions";

/// Sign in and persist the issued token pair.
///
/// `POST /sessions` is public, so a 401 here is a credential failure and is
/// returned as-is without any refresh attempt.
pub async fn login(client: &ApiClient, credentials: &LoginRequest) -> Result<AuthTokens> {
    let envelope: Envelope<AuthTokens> = client.post_json(SESSIONS_ENDPOINT, credentials).await?;
    let tokens = envelope.into_data("login")?;
    client.store().save_tokens(&TokenPair::from(&tokens)).await?;
    tracing::info!("signed in");
    Ok(tokens)
}

/// Sign out. The local session is cleared even if the backend call fails.
///
/// `/sessions` is public, so the token is attached explicitly; the request
/// stage leaves it in place and a 401 does not trigger a refresh.
pub async fn logout(client: &ApiClient) -> Result<()> {
    let mut request = RequestContext::delete(SESSIONS_ENDPOINT);
    match client.store().access_token().await {
        Ok(Some(token)) => request = request.with_bearer(&token),
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, "could not read access token, logging out without it");
        }
    }
    if let Err(err) = client.send(request).await {
        tracing::warn!(error = %err, "logout call failed, clearing local session anyway");
    }
    client.store().clear_all().await?;
    Ok(())
}

/// Exchange `refresh_token` for a new pair without touching the store.
///
/// A 401 from this call tears down the local session, like a failed
/// automatic refresh.
pub async fn refresh_tokens(client: &ApiClient, refresh_token: &str) -> Result<AuthTokens> {
    let envelope: Envelope<AuthTokens> = client
        .post_json(REFRESH_ENDPOINT, &json!({ "refreshToken": refresh_token }))
        .await?;
    envelope.into_data("refresh token")
}
