// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Local key-value storage
//
// String values keyed by name, kept in one local JSON file.
// Writes are not transactional across keys.

use crate::types::AppError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Session token issued at OTP verification
pub const USER_TOKEN_KEY: &str = "userToken";
/// JSON-serialized user profile
pub const USER_DATA_KEY: &str = "userData";
/// Push provider device registration token
pub const FCM_TOKEN_KEY: &str = "fcmToken";

const STORAGE_FILE: &str = "storage.json";

/// Persistent string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// File-backed store, one JSON object per installation
pub struct FileKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
    file_path: PathBuf,
}

impl FileKeyValueStore {
    /// Open the store in `dir`, loading existing entries
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Storage(format!("Failed to create storage dir: {}", e)))?;
        let file_path = dir.join(STORAGE_FILE);

        let entries = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .map_err(|e| AppError::Storage(format!("Failed to read storage: {}", e)))?;

            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse storage, starting empty: {}", e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            file_path,
        })
    }

    fn persist(&self) -> Result<(), AppError> {
        let content = {
            let entries = self
                .entries
                .read()
                .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
            serde_json::to_string_pretty(&*entries).map_err(|e| {
                AppError::Serialization(format!("Failed to serialize storage: {}", e))
            })?
        };

        fs::write(&self.file_path, content)
            .map_err(|e| AppError::Storage(format!("Failed to write storage: {}", e)))?;

        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
            entries.insert(key.to_string(), value.to_string());
        }
        self.persist()
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        {
            let mut entries = self
                .entries
                .write()
                .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
            if entries.remove(key).is_none() {
                return Ok(());
            }
        }
        self.persist()
    }
}

/// Volatile store, used by tests and ephemeral shells
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Storage("Storage lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
