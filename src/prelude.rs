//! Convenience re-exports for common use.

pub use crate::api::{AuthTokens, LoginRequest, SessionData};
pub use crate::auth::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
pub use crate::client::{ApiClient, ApiResponse, RequestContext};
pub use crate::config::ClientConfig;
pub use crate::error::{ApiError, Result, WaybillError};
