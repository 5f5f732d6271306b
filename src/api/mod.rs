//! Typed helpers for the backend's auth and session endpoints.

pub mod auth;
pub mod session;
pub mod types;

pub use auth::{login, logout, refresh_tokens};
pub use session::{current_session, fetch_current_session};
pub use types::{
    AuthTokens, CurrentSession, Envelope, LoginRequest, Permission, PermissionModule, Role,
    SessionData,
};
