//! Secret store port
//!
//! Definitions reference secrets by name; adapter operations resolve them
//! through this port at call time. Secret values are never logged.

use crate::error::{Result, TetherError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::fs;

/// Named secret storage.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a secret by name.
    async fn get(&self, name: &str) -> Result<Option<String>>;

    /// Store or overwrite a secret.
    async fn set(&self, name: &str, value: &str) -> Result<()>;

    /// Look up a secret that must exist.
    async fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .await?
            .ok_or_else(|| TetherError::SecretNotFound(name.to_string()))
    }
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for Arc<T> {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        (**self).get(name).await
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        (**self).set(name, value).await
    }
}

/// In-memory store for tests and single-process hosts.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| TetherError::Config("secret store lock poisoned".to_string()))?;
        Ok(entries.get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| TetherError::Config("secret store lock poisoned".to_string()))?;
        entries.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Store keeping secrets as a JSON map on disk.
///
/// Suitable for development hosts. The whole file is rewritten on every
/// `set`; concurrent writers need external discipline.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let entries = self.load().await?;
        Ok(entries.get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut entries = self.load().await?;
        entries.insert(name.to_string(), value.to_string());
        self.save(&entries).await?;
        tracing::debug!(secret = name, "Stored secret");
        Ok(())
    }
}
