// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Session persistence
//
// The active session is the pair (userToken, userData) in local storage.
// Exactly one session exists per installation.

use crate::storage::{KeyValueStore, FCM_TOKEN_KEY, USER_DATA_KEY, USER_TOKEN_KEY};
use crate::types::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Activation flag value the backend uses for an incomplete profile
pub const INACTIVE_FLAG: &str = "N";

/// Profile of the logged-in mitra as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Phone number, the account identifier
    pub no_hp: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id_konsumen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    /// Activation flag, "Y" or "N"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Fields the client does not interpret, kept so the profile
    /// round-trips to storage unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn is_inactive(&self) -> bool {
        self.status.as_deref() == Some(INACTIVE_FLAG)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub profile: UserProfile,
}

/// Reads and writes the session entries of a key-value store
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn token(&self) -> Result<Option<String>, AppError> {
        Ok(self
            .storage
            .get(USER_TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    /// The profile exactly as it was persisted
    pub fn raw_profile(&self) -> Result<Option<String>, AppError> {
        self.storage.get(USER_DATA_KEY)
    }

    /// Parsed profile; unreadable data counts as no profile
    pub fn profile(&self) -> Result<Option<UserProfile>, AppError> {
        let Some(raw) = self.raw_profile()? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!("Stored profile is unreadable, ignoring: {}", e);
                Ok(None)
            }
        }
    }

    /// The current session, if both token and profile are present
    pub fn load(&self) -> Result<Option<Session>, AppError> {
        match (self.token()?, self.profile()?) {
            (Some(token), Some(profile)) => Ok(Some(Session { token, profile })),
            _ => Ok(None),
        }
    }

    /// Token of the current session or `NotAuthenticated`
    pub fn require_token(&self) -> Result<String, AppError> {
        self.token()?.ok_or(AppError::NotAuthenticated)
    }

    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let profile = serde_json::to_string(&session.profile)?;
        self.storage.set(USER_TOKEN_KEY, &session.token)?;
        self.storage.set(USER_DATA_KEY, &profile)?;
        tracing::info!("Session stored for {}", session.profile.no_hp);
        Ok(())
    }

    /// Remove token, then profile. Not atomic.
    pub fn clear(&self) -> Result<(), AppError> {
        self.storage.remove(USER_TOKEN_KEY)?;
        self.storage.remove(USER_DATA_KEY)?;
        tracing::info!("Session cleared");
        Ok(())
    }

    pub fn push_token(&self) -> Result<Option<String>, AppError> {
        self.storage.get(FCM_TOKEN_KEY)
    }

    pub fn set_push_token(&self, token: &str) -> Result<(), AppError> {
        self.storage.set(FCM_TOKEN_KEY, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn store() -> (Arc<MemoryKeyValueStore>, SessionStore) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        (kv.clone(), SessionStore::new(kv))
    }

    #[test]
    fn test_profile_accepts_numeric_id_and_keeps_extra_fields() {
        let raw = r#"{"no_hp":"6281234567890","id_konsumen":42,"status":"N","kota":"Bandung"}"#;
        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.id_konsumen.as_deref(), Some("42"));
        assert!(profile.is_inactive());
        assert_eq!(profile.extra.get("kota"), Some(&Value::from("Bandung")));
    }

    #[test]
    fn test_save_load_and_clear() {
        let (kv, sessions) = store();
        let profile: UserProfile =
            serde_json::from_str(r#"{"no_hp":"628111","id_konsumen":"7"}"#).unwrap();
        let session = Session {
            token: "tok".to_string(),
            profile,
        };

        sessions.save(&session).unwrap();
        assert_eq!(sessions.load().unwrap(), Some(session));

        sessions.clear().unwrap();
        assert_eq!(kv.get(USER_TOKEN_KEY).unwrap(), None);
        assert_eq!(kv.get(USER_DATA_KEY).unwrap(), None);
        assert_eq!(sessions.load().unwrap(), None);
    }

    #[test]
    fn test_unreadable_profile_is_missing() {
        let (kv, sessions) = store();
        kv.set(USER_TOKEN_KEY, "tok").unwrap();
        kv.set(USER_DATA_KEY, "not json").unwrap();
        assert_eq!(sessions.profile().unwrap(), None);
        assert_eq!(sessions.load().unwrap(), None);
        assert_eq!(sessions.token().unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn test_require_token() {
        let (kv, sessions) = store();
        assert!(matches!(
            sessions.require_token(),
            Err(AppError::NotAuthenticated)
        ));
        kv.set(USER_TOKEN_KEY, "").unwrap();
        assert!(sessions.require_token().is_err());
    }
}
