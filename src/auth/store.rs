use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::StoreError;
use super::token::{StorageKey, TokenPair};

/// Storage abstraction for the persisted session.
///
/// Backends only implement `get`/`set`/`delete`; the session-level helpers
/// are provided on top of those three calls.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: StorageKey) -> Result<(), StoreError>;

    /// Write `value` with an expiry attached as entry metadata.
    /// Backends that cannot hold metadata keep only the value.
    async fn set_expiring(
        &self,
        key: StorageKey,
        value: &str,
        _expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.set(key, value).await
    }

    /// Expiry recorded alongside `key`, if any.
    async fn expiry(&self, _key: StorageKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(None)
    }

    async fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(StorageKey::AccessToken).await
    }

    async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(StorageKey::RefreshToken).await
    }

    /// Persist both halves of a token pair. The expiry rides on the
    /// access-token entry.
    async fn save_tokens(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.set_expiring(StorageKey::AccessToken, &pair.access_token, pair.expires_at)
            .await?;
        self.set(StorageKey::RefreshToken, &pair.refresh_token).await
    }

    /// Read the stored pair. Returns `None` unless both tokens are present.
    async fn load_tokens(&self) -> Result<Option<TokenPair>, StoreError> {
        let access = self.get(StorageKey::AccessToken).await?;
        let refresh = self.get(StorageKey::RefreshToken).await?;
        let (Some(access), Some(refresh)) = (access, refresh) else {
            return Ok(None);
        };
        let expires_at = self.expiry(StorageKey::AccessToken).await?;
        Ok(Some(TokenPair::new(access, refresh).with_expiry(expires_at)))
    }

    async fn save_user(&self, user: &Value) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(user)?;
        self.set(StorageKey::User, &serialized).await
    }

    async fn load_user(&self) -> Result<Option<Value>, StoreError> {
        match self.get(StorageKey::User).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Delete every key. All deletes are attempted; the first failure is
    /// returned.
    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in StorageKey::ALL {
            if let Err(err) = self.delete(key).await {
                tracing::warn!(key = %key, error = %err, "failed to delete stored credential");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self
            .access_token()
            .await?
            .is_some_and(|token| !token.is_empty()))
    }
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_waybill_dir()
    }
}

/// Durable token store writing one TOML file per key.
///
/// # Example
/// ```no_run
/// use waybill::auth::{FileTokenStore, TokenPair, TokenStore};
///
/// # async fn example() -> Result<(), waybill::auth::StoreError> {
/// let store = FileTokenStore::new_default();
/// store.save_tokens(&TokenPair::new("access", "refresh")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_waybill_dir(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: StorageKey) -> PathBuf {
        self.base_dir.join(format!("{}.toml", key.as_str()))
    }

    async fn read_entry(&self, key: StorageKey) -> Result<Option<StoreEntry>, StoreError> {
        let path = self.entry_path(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };
        Ok(Some(toml::from_str(&raw)?))
    }

    async fn write_entry(&self, entry: &StoreEntry, key: StorageKey) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let serialized = toml::to_string(entry)?;
        let path = self.entry_path(key);
        let temp_path = self.base_dir.join(format!(
            ".{}.toml.tmp-{}-{}",
            key.as_str(),
            std::process::id(),
            WRITE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        // Readers only ever see the old or the new file, never a partial one.
        if let Err(err) = write_private(&temp_path, serialized.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }
        Ok(())
    }
}

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

async fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        Ok(self.read_entry(key).await?.map(|entry| entry.value))
    }

    async fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.set_expiring(key, value, None).await
    }

    async fn set_expiring(
        &self,
        key: StorageKey,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let entry = StoreEntry {
            version: 1,
            key: key.as_str().to_string(),
            value: value.to_string(),
            expires_at,
            saved_at: Utc::now(),
        };
        self.write_entry(&entry, key).await
    }

    async fn expiry(&self, key: StorageKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read_entry(key).await?.and_then(|entry| entry.expires_at))
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreEntry {
    version: u32,
    key: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    saved_at: DateTime<Utc>,
}

/// In-process token store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<StorageKey, MemoryEntry>>,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<StorageKey, MemoryEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(&key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.set_expiring(key, value, None).await
    }

    async fn set_expiring(
        &self,
        key: StorageKey,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at,
        };
        self.lock()?.insert(key, entry);
        Ok(())
    }

    async fn expiry(&self, key: StorageKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock()?.get(&key).and_then(|entry| entry.expires_at))
    }

    async fn delete(&self, key: StorageKey) -> Result<(), StoreError> {
        self.lock()?.remove(&key);
        Ok(())
    }
}

fn default_waybill_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".waybill"))
        .unwrap_or_else(|| PathBuf::from(".waybill"))
}
