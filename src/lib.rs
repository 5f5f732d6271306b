//! Waybill: authenticated API client for the driver logistics backend.
//!
//! Wraps outbound HTTP calls with bearer-token authorization, refreshes an
//! expired access token transparently on the first 401, and makes concurrent
//! requests share a single refresh call.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use waybill::prelude::*;
//!
//! # async fn example() -> waybill::error::Result<()> {
//! let store = Arc::new(FileTokenStore::new_default());
//! let client = ApiClient::new(ClientConfig::from_env()?, store)?;
//! waybill::api::login(&client, &LoginRequest::new("0912345678", "abc123")).await?;
//! let me = waybill::api::current_session(&client).await?;
//! println!("{}", me.display_name());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
