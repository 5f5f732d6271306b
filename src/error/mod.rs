//! Error types for Waybill.

pub mod normalize;

pub use normalize::{normalize_body, ApiError};

use thiserror::Error;

use crate::auth::StoreError;

/// Primary error type for all Waybill operations.
#[derive(Error, Debug)]
pub enum WaybillError {
    /// A backend call failed; the body has been normalized.
    #[error("API error (status {}): {}", .0.status_code, .0.message)]
    Api(ApiError),

    /// The refresh token was missing, rejected, or the refresh call failed.
    /// The local session has already been torn down when this is returned.
    #[error("Token refresh failed: {}", .0.message)]
    RefreshFailed(ApiError),

    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad error category, mirroring how UI code reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 401 that was not recovered by a refresh: bad credentials, or a
    /// protected endpoint still rejecting the fresh token.
    Credential,
    /// Session is gone; the caller should send the user back to login.
    RefreshFailure,
    Transport,
    Storage,
    Configuration,
}

impl WaybillError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RefreshFailed(_) | Self::NotAuthenticated => ErrorCategory::RefreshFailure,
            Self::Api(err) if err.status_code == 401 => ErrorCategory::Credential,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Configuration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Transport,
        }
    }

    /// Whether the caller must treat the local session as logged out.
    pub fn is_session_lost(&self) -> bool {
        self.category() == ErrorCategory::RefreshFailure
    }

    /// Collapse any failure into the single normalized shape handed to UI code.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            Self::Api(err) | Self::RefreshFailed(err) => err.clone(),
            Self::NotAuthenticated => ApiError::new("Not authenticated", 401),
            Self::Network(err) => ApiError::new(
                err.to_string(),
                err.status().map(|s| s.as_u16()).unwrap_or(ApiError::DEFAULT_STATUS),
            ),
            other => ApiError::new(other.to_string(), ApiError::DEFAULT_STATUS),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, WaybillError>;
