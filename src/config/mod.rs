//! Client configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::TokenStoreConfig;
use crate::error::{Result, WaybillError};

pub const DEFAULT_API_VERSION: &str = "api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_API_URL: &str = "WAYBILL_API_URL";
const ENV_API_VERSION: &str = "WAYBILL_API_VERSION";
const ENV_TIMEOUT_SECS: &str = "WAYBILL_TIMEOUT_SECS";
const ENV_TOKEN_DIR: &str = "WAYBILL_TOKEN_DIR";

/// Settings for [`crate::client::ApiClient`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use waybill::config::ClientConfig;
///
/// let config = ClientConfig::new("https://api.example.com/")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.api_root(), "https://api.example.com/api/v1");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_version: String,
    /// Bound on every request, including the refresh call and retries.
    pub timeout: Duration,
    pub token_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token_dir: TokenStoreConfig::default_dir(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token_dir(mut self, dir: PathBuf) -> Self {
        self.token_dir = dir;
        self
    }

    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let base_url = std::env::var(ENV_API_URL).map_err(|_| {
            WaybillError::Configuration(format!("{ENV_API_URL} is not set"))
        })?;
        let mut config = Self::new(base_url);

        if let Ok(version) = std::env::var(ENV_API_VERSION) {
            config.api_version = version;
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                WaybillError::Configuration(format!(
                    "{ENV_TIMEOUT_SECS} must be whole seconds, got {raw:?}"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var(ENV_TOKEN_DIR) {
            config.token_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(WaybillError::Configuration("base URL is empty".to_string()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(WaybillError::Configuration(format!(
                "base URL must be http(s): {base}"
            )));
        }
        if self.timeout.is_zero() {
            return Err(WaybillError::Configuration("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// `<base_url>/<api_version>` with duplicate slashes collapsed.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let version = self.api_version.trim().trim_matches('/');
        if version.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{version}")
        }
    }

    /// Absolute URL for an endpoint path such as `/sessions`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root(), path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_root_joins_base_and_version() {
        let config = ClientConfig::new("https://api.example.com");
        assert_eq!(config.api_root(), "https://api.example.com/api/v1");

        let config = ClientConfig::new("https://api.example.com/").with_api_version("/api/v2/");
        assert_eq!(config.api_root(), "https://api.example.com/api/v2");
    }

    #[test]
    fn endpoint_url_keeps_query() {
        let config = ClientConfig::new("http://localhost:8080");
        assert_eq!(
            config.endpoint_url("/sessions/current?full=1"),
            "http://localhost:8080/api/v1/sessions/current?full=1"
        );
    }

    #[test]
    fn empty_version_uses_bare_base() {
        let config = ClientConfig::new("http://localhost:8080").with_api_version("");
        assert_eq!(config.endpoint_url("sessions"), "http://localhost:8080/sessions");
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("ftp://host").validate().is_err());
        assert!(ClientConfig::new("https://host")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ClientConfig::new("https://host").validate().is_ok());
    }
}
