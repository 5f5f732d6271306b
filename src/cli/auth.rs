//! CLI command handlers for login, status, logout, and session.

use std::sync::Arc;

use crate::api::{self, LoginRequest};
use crate::auth::{FileTokenStore, TokenStore, TokenStoreConfig};
use crate::client::ApiClient;
use crate::config::ClientConfig;

fn build_client() -> Result<ApiClient, Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let store = Arc::new(FileTokenStore::new(TokenStoreConfig::new(
        config.token_dir.clone(),
    )));
    Ok(ApiClient::new(config, store)?)
}

/// Handle `waybill auth login`.
pub async fn handle_login(phone: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client()?;
    let tokens = api::login(&client, &LoginRequest::new(phone, password)).await?;
    println!("✅ Signed in");
    if let Some(expires_at) = tokens.expires_at() {
        println!("   Access token expires: {}", expires_at.to_rfc3339());
    }
    Ok(())
}

/// Handle `waybill auth status`.
pub async fn handle_status() -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client()?;
    let store = client.store();
    if !store.is_authenticated().await? {
        println!("Not signed in");
        return Ok(());
    }
    println!("Signed in (tokens stored in {})", client.config().token_dir.display());
    if let Some(pair) = store.load_tokens().await? {
        if let Some(expires_at) = pair.expires_at {
            let state = if pair.is_expired(chrono::Utc::now()) {
                "expired, refreshes on next request"
            } else {
                "valid"
            };
            println!("   Access token: {state} (expires {})", expires_at.to_rfc3339());
        }
    }
    if let Some(user) = store.load_user().await? {
        let name = user
            .get("fullName")
            .and_then(|v| v.as_str())
            .or_else(|| user.get("phoneNumber").and_then(|v| v.as_str()))
            .unwrap_or("unknown");
        println!("   Cached user: {name}");
    }
    Ok(())
}

/// Handle `waybill auth logout`.
pub async fn handle_logout() -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client()?;
    api::logout(&client).await?;
    println!("✅ Signed out");
    Ok(())
}

/// Handle `waybill session`.
pub async fn handle_session() -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client()?;
    match api::current_session(&client).await {
        Ok(user) => {
            println!("{} (id {}, {})", user.display_name(), user.id, user.status);
            if let Some(role) = &user.role {
                println!("   Role: {} ({})", role.name, role.code);
            }
            Ok(())
        }
        Err(err) if err.is_session_lost() => {
            eprintln!("Session expired. Run `waybill auth login` to sign in again.");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
