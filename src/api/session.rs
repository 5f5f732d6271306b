//! Current-session lookup.

use super::types::{CurrentSession, Envelope, SessionData};
use crate::client::ApiClient;
use crate::error::{Result, WaybillError};

pub const CURRENT_SESSION_ENDPOINT: &str = "/sessions/current";

/// Fetch the session payload, including permissions.
pub async fn fetch_current_session(client: &ApiClient) -> Result<CurrentSession> {
    if !client.store().is_authenticated().await? {
        return Err(WaybillError::NotAuthenticated);
    }
    let envelope: Envelope<CurrentSession> = client.get_json(CURRENT_SESSION_ENDPOINT).await?;
    envelope.into_data("session")
}

/// Fetch the signed-in user and cache it in the token store.
pub async fn current_session(client: &ApiClient) -> Result<SessionData> {
    let session = fetch_current_session(client).await?;
    let user = session.user.ok_or_else(|| {
        WaybillError::InvalidResponse("Invalid session response format".to_string())
    })?;
    client.store().save_user(&serde_json::to_value(&user)?).await?;
    tracing::debug!(user_id = user.id, "session loaded");
    Ok(user)
}
