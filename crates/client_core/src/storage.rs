//! Browser-style local storage: string values under fixed keys.
//!
//! The dashboard keeps only two kinds of entries here: the auth token and one
//! "connected" flag per third-party integration.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use shared::domain::Platform;
use thiserror::Error;
use tracing::debug;

pub const AUTH_TOKEN_KEY: &str = "token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access storage file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("storage file '{path}' is not a flat JSON object: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub fn integration_key(platform: Platform) -> &'static str {
    match platform {
        Platform::Facebook => "facebookConnected",
        Platform::Instagram => "instagramConnected",
        Platform::Linkedin => "linkedinConnected",
        Platform::Twitter => "twitterConnected",
        Platform::Google => "googleConnected",
        Platform::Tiktok => "tiktokConnected",
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

/// Flat JSON object on disk, rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = entries.len(), "opened local storage");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }
}

/// Typed view over the fixed keys.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<dyn KeyValueStore>,
}

impl LocalStorage {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn token(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .inner
            .get(AUTH_TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.inner.set(AUTH_TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        self.inner.remove(AUTH_TOKEN_KEY)
    }

    pub fn integration_connected(&self, platform: Platform) -> Result<bool, StorageError> {
        Ok(self.inner.get(integration_key(platform))?.as_deref() == Some("true"))
    }

    pub fn set_integration_connected(
        &self,
        platform: Platform,
        connected: bool,
    ) -> Result<(), StorageError> {
        let value = if connected { "true" } else { "false" };
        self.inner.set(integration_key(platform), value)
    }

    pub fn connected_integrations(&self) -> Result<Vec<Platform>, StorageError> {
        let mut connected = Vec::new();
        for platform in Platform::ALL {
            if self.integration_connected(platform)? {
                connected.push(platform);
            }
        }
        Ok(connected)
    }
}

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
mod tests;
