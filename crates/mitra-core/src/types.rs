// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Type definitions

use serde::{Deserialize, Serialize};

/// Custom URI scheme the app is registered for
pub const DEFAULT_SCHEME: &str = "mitra-klikquick";

/// Application settings (UI-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Base URL of the remote mitra API
    pub api_base_url: String,
    /// Custom deep-link scheme, without the "://"
    #[serde(default = "default_scheme")]
    pub deep_link_scheme: String,
    /// HTTPS hostnames routed into the app as universal links
    #[serde(default = "default_universal_link_hosts")]
    pub universal_link_hosts: Vec<String>,
    /// Delay before routing a notification that cold-started the app
    #[serde(default = "default_cold_start_delay_ms")]
    pub cold_start_delay_ms: u64,
    /// How long the in-app banner stays visible
    #[serde(default = "default_banner_hide_ms")]
    pub banner_hide_ms: u64,
    /// Smallest accepted top-up, withdraw or transfer amount (rupiah)
    #[serde(default = "default_min_amount")]
    pub min_amount: u64,
    /// Request timeout for API calls in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Device name sent along with push token registration
    pub device_name: String,
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_universal_link_hosts() -> Vec<String> {
    vec![
        "mitra.klikquick.id".to_string(),
        "klikquick.id".to_string(),
        "www.klikquick.id".to_string(),
    ]
}

fn default_cold_start_delay_ms() -> u64 {
    1000
}

fn default_banner_hide_ms() -> u64 {
    5000
}

fn default_min_amount() -> u64 {
    10_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.klikquick.id/mitra/".to_string(),
            deep_link_scheme: default_scheme(),
            universal_link_hosts: default_universal_link_hosts(),
            cold_start_delay_ms: default_cold_start_delay_ms(),
            banner_hide_ms: default_banner_hide_ms(),
            min_amount: default_min_amount(),
            request_timeout_secs: default_request_timeout_secs(),
            device_name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "Mitra Device".to_string()),
        }
    }
}

/// Error types for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API rejected request: {0}")]
    Api(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Push provider error: {0}")]
    Push(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppError {
    /// Localized text shown to the user in a blocking alert
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Tidak dapat terhubung ke server. Periksa koneksi internet Anda.".to_string()
            }
            Self::Api(message) if !message.is_empty() => message.clone(),
            Self::Api(_) => "Terjadi kesalahan. Silakan coba lagi.".to_string(),
            Self::NotAuthenticated => "Sesi Anda telah berakhir. Silakan masuk kembali.".to_string(),
            Self::InvalidInput(message) => message.clone(),
            Self::Push(_) => "Notifikasi tidak tersedia.".to_string(),
            Self::InvalidLink(_)
            | Self::Navigation(_)
            | Self::Storage(_)
            | Self::Serialization(_)
            | Self::InvalidConfig(_) => "Terjadi kesalahan pada aplikasi.".to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::InvalidLink(err.to_string())
    }
}

/// Normalize an Indonesian phone number to its `62...` form.
///
/// Spaces, dashes, dots and a leading `+` are stripped and a leading `0`
/// becomes `62`. The result must be 9 to 15 digits.
pub fn normalize_phone(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput(
            "Nomor HP hanya boleh berisi angka".to_string(),
        ));
    }

    let normalized = match digits.strip_prefix('0') {
        Some(rest) => format!("62{}", rest),
        None => digits,
    };

    if !(9..=15).contains(&normalized.len()) {
        return Err(AppError::InvalidInput(
            "Panjang nomor HP tidak valid".to_string(),
        ));
    }

    Ok(normalized)
}

/// Backend ids arrive as numbers or strings; keep them as strings
pub(crate) fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Amounts arrive as numbers or numeric strings
pub(crate) fn amount_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .ok_or_else(|| serde::de::Error::custom("negative amount")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0)
            .map(|f| f.round() as u64)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {}", s))),
        serde_json::Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "expected amount, got {}",
            other
        ))),
    }
}
