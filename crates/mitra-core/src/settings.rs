// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Settings persistence
//
// Settings are stored in a local JSON file next to the key-value storage.

use crate::types::{AppError, AppSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const SETTINGS_FILE: &str = "settings.json";

/// Platform config directory for the app, created if missing
pub fn default_config_dir() -> Result<PathBuf, AppError> {
    let config_dir = directories::ProjectDirs::from("id", "klikquick", "mitra")
        .ok_or_else(|| AppError::Storage("Could not determine config directory".to_string()))?
        .config_dir()
        .to_path_buf();

    fs::create_dir_all(&config_dir)
        .map_err(|e| AppError::Storage(format!("Failed to create config dir: {}", e)))?;

    Ok(config_dir)
}

/// In-memory cache of settings, persisted to disk on changes
pub struct SettingsStore {
    settings: RwLock<AppSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    /// Open the settings store in the platform config directory
    pub fn new() -> Result<Self, AppError> {
        Self::open(&default_config_dir()?)
    }

    /// Open the settings store in `dir`, writing defaults on first run
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Storage(format!("Failed to create config dir: {}", e)))?;
        let file_path = dir.join(SETTINGS_FILE);
        tracing::info!("Settings file path: {:?}", file_path);

        let settings = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .map_err(|e| AppError::Storage(format!("Failed to read settings: {}", e)))?;

            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse settings, using defaults: {}", e);
                AppSettings::default()
            })
        } else {
            tracing::info!("No settings file found, using defaults");
            AppSettings::default()
        };

        let store = Self {
            settings: RwLock::new(settings),
            file_path,
        };

        if !store.file_path.exists() {
            tracing::info!("Creating initial settings file");
            store.persist()?;
        }

        Ok(store)
    }

    fn persist(&self) -> Result<(), AppError> {
        let content = {
            let settings = self
                .settings
                .read()
                .map_err(|_| AppError::Storage("Settings lock poisoned".to_string()))?;
            serde_json::to_string_pretty(&*settings).map_err(|e| {
                AppError::Serialization(format!("Failed to serialize settings: {}", e))
            })?
        };

        fs::write(&self.file_path, content)
            .map_err(|e| AppError::Storage(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> AppSettings {
        self.settings
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Replace settings and persist to disk
    pub fn update(&self, new_settings: AppSettings) -> Result<(), AppError> {
        tracing::info!("Updating settings, api: {}", new_settings.api_base_url);
        {
            let mut settings = self
                .settings
                .write()
                .map_err(|_| AppError::Storage("Settings lock poisoned".to_string()))?;
            *settings = new_settings;
        }

        let result = self.persist();
        if let Err(e) = &result {
            tracing::error!("Failed to persist settings: {}", e);
        }
        result
    }
}
