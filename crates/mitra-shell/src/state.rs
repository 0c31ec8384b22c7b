// SPDX-License-Identifier: AGPL-3.0
// Mitra Shell - Application State

use mitra_core::settings::default_config_dir;
use mitra_core::{
    ApiClient, AppError, AppSettings, AuthService, Backend, ContactBook, FileKeyValueStore,
    HttpApiClient, Orders, SessionStore, SettingsStore, Wallet,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, wired once per run
pub struct AppState {
    /// Effective settings, including command-line overrides
    pub config: AppSettings,
    pub sessions: SessionStore,
    pub api: Arc<dyn ApiClient>,
    pub auth: AuthService,
    pub contacts: ContactBook,
    pub wallet: Wallet,
    pub orders: Orders,
}

impl AppState {
    pub fn new(config_dir: Option<PathBuf>, api_url: Option<String>) -> Result<Self, AppError> {
        let dir = match config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let settings = SettingsStore::open(&dir)?;
        let mut config = settings.get();
        if let Some(url) = api_url {
            tracing::info!("Using API base URL {}", url);
            config.api_base_url = url;
        }

        let storage = Arc::new(FileKeyValueStore::open(&dir)?);
        let api = Arc::new(HttpApiClient::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?);

        Ok(Self::with_parts(config, SessionStore::new(storage), api))
    }

    pub fn with_parts(
        config: AppSettings,
        sessions: SessionStore,
        api: Arc<dyn ApiClient>,
    ) -> Self {
        let backend = Backend::new(api.clone(), sessions.clone());
        Self {
            auth: AuthService::new(backend.clone()),
            contacts: ContactBook::new(backend.clone()),
            wallet: Wallet::new(backend.clone(), config.min_amount),
            orders: Orders::new(backend),
            config,
            sessions,
            api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_writes_settings_and_applies_override() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            Some(dir.path().to_path_buf()),
            Some("http://localhost:9000/api/".to_string()),
        )
        .unwrap();

        assert_eq!(state.config.api_base_url, "http://localhost:9000/api/");
        assert!(dir.path().join("settings.json").exists());

        // The override is not persisted
        let stored = SettingsStore::open(dir.path()).unwrap().get();
        assert_eq!(stored.api_base_url, AppSettings::default().api_base_url);
    }

    #[test]
    fn test_bad_api_url_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppState::new(Some(dir.path().to_path_buf()), Some("::".to_string()));
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }
}
