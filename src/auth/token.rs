use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical keys held by a token store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    /// Cached user profile, stored as a JSON string.
    User,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access/refresh credential pair issued at login and rotated at refresh.
///
/// # Example
/// ```
/// use waybill::auth::TokenPair;
///
/// let pair = TokenPair::new("A1", "R1");
/// assert_eq!(pair.access_token, "A1");
/// assert!(pair.expires_at.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Whether the access token is known to be past its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}
