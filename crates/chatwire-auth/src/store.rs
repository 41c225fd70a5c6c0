//! Durable storage for the active credential.
//!
//! The [`TokenStore`](crate::TokenStore) writes through to a
//! [`CredentialStore`] after every update or clear; the storage format is
//! owned entirely by the store implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::credential::StoredCredential;
use crate::error::{AuthError, Result};

/// Default credential file name within the chatwire config directory.
pub const CREDENTIAL_FILE: &str = "credentials.json";

// ============================================================================
// CredentialStore Trait
// ============================================================================

/// Persistence slot for a single credential.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    async fn load(&self) -> Result<Option<StoredCredential>>;

    async fn save(&self, credential: &StoredCredential) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Shared credential store handle.
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

// ============================================================================
// FileCredentialStore
// ============================================================================

/// JSON-file credential store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<StoredCredential>>,
}

impl FileCredentialStore {
    /// Store `credentials.json` inside `config_dir`.
    pub fn new(config_dir: &Path) -> Self {
        Self::with_path(config_dir.join(CREDENTIAL_FILE))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredential>> {
        {
            let cache = self.cached.read().await;
            if cache.is_some() {
                return Ok(cache.clone());
            }
        }

        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AuthError::Storage(format!("Failed to read credential file: {}", e)))?;

        let stored: StoredCredential = serde_json::from_str(&content).map_err(|e| {
            AuthError::Serialization(format!("Failed to parse credential file: {}", e))
        })?;

        *self.cached.write().await = Some(stored.clone());
        Ok(Some(stored))
    }

    async fn save(&self, credential: &StoredCredential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::Storage(format!("Failed to create credential directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(credential).map_err(|e| {
            AuthError::Serialization(format!("Failed to serialize credential: {}", e))
        })?;

        std::fs::write(&self.path, json)
            .map_err(|e| AuthError::Storage(format!("Failed to write credential file: {}", e)))?;

        *self.cached.write().await = Some(credential.clone());

        tracing::debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                AuthError::Storage(format!("Failed to delete credential file: {}", e))
            })?;
        }
        *self.cached.write().await = None;
        Ok(())
    }
}

// ============================================================================
// InMemoryCredentialStore
// ============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: RwLock<Option<StoredCredential>>,
    saves: std::sync::atomic::AtomicU32,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: StoredCredential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
            saves: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> u32 {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredential>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, credential: &StoredCredential) -> Result<()> {
        *self.slot.write().await = Some(credential.clone());
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}
