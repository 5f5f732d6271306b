//! Backend wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::error::{Result, WaybillError};

/// `{ success, data }` wrapper used by every backend response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// The payload, if the backend reported success and sent one.
    pub fn into_data(self, what: &str) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(WaybillError::InvalidResponse(format!(
                "Invalid {what} response format"
            ))),
        }
    }
}

/// Credentials posted to `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(phone_number: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            password: password.into(),
        }
    }
}

/// Token payload returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expired_at: Option<i64>,
}

impl AuthTokens {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.access_token_expired_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

impl From<&AuthTokens> for TokenPair {
    fn from(tokens: &AuthTokens) -> Self {
        TokenPair::new(tokens.access_token.clone(), tokens.refresh_token.clone())
            .with_expiry(tokens.expires_at())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub code: String,
}

/// The signed-in user as reported by `GET /sessions/current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub id: i64,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub full_name: Option<String>,
    pub role_id: i64,
    pub status: String,
    #[serde(default)]
    pub is_system: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub created_by_id: Option<i64>,
    #[serde(default)]
    pub updated_by_id: Option<i64>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl SessionData {
    /// Best label to show for the user.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.phone_number.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionModule {
    pub module: String,
    pub module_name: String,
    #[serde(default)]
    pub module_description: String,
    pub permissions: Vec<Permission>,
}

/// `data` of `GET /sessions/current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSession {
    pub user: Option<SessionData>,
    #[serde(default)]
    pub permissions: Vec<PermissionModule>,
}

impl CurrentSession {
    /// Whether `code` is allowed in any module.
    pub fn is_allowed(&self, code: &str) -> bool {
        self.permissions
            .iter()
            .flat_map(|module| module.permissions.iter())
            .any(|permission| permission.code == code && permission.allowed)
    }
}
