// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - OTP authentication
//
// Phone number in, one-time password out by SMS/WhatsApp, session in
// local storage once the code checks out.

use crate::api::{Backend, Endpoint};
use crate::session::{Session, UserProfile};
use crate::types::{normalize_phone, AppError};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct VerifyOtpData {
    token: String,
    user: Value,
}

pub struct AuthService {
    backend: Backend,
}

impl AuthService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Ask the backend to send an OTP to `phone`.
    ///
    /// Returns the normalized phone number for the verify step.
    pub async fn send_otp(&self, phone: &str) -> Result<String, AppError> {
        let no_hp = normalize_phone(phone)?;
        tracing::info!("Requesting OTP for {}", no_hp);
        self.backend
            .call_public(Endpoint::SendOtp, json!({ "no_hp": no_hp }))
            .await?;
        Ok(no_hp)
    }

    /// Check the OTP and store the resulting session
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<Session, AppError> {
        let no_hp = normalize_phone(phone)?;
        let code = code.trim();
        if !(4..=6).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::InvalidInput(
                "Kode OTP harus 4-6 digit angka".to_string(),
            ));
        }

        let data = self
            .backend
            .call_public(Endpoint::VerifyOtp, json!({ "no_hp": no_hp, "otp": code }))
            .await?
            .ok_or_else(|| AppError::Serialization("Verify response has no data".to_string()))?;
        let data: VerifyOtpData = serde_json::from_value(data)
            .map_err(|e| AppError::Serialization(format!("Unexpected verify response: {}", e)))?;
        if data.token.is_empty() {
            return Err(AppError::Serialization("Verify response has empty token".to_string()));
        }

        let profile: UserProfile = serde_json::from_value(data.user)
            .map_err(|e| AppError::Serialization(format!("Unexpected user profile: {}", e)))?;
        let session = Session {
            token: data.token,
            profile,
        };
        self.backend.sessions().save(&session)?;
        tracing::info!("Logged in as {}", session.profile.no_hp);
        Ok(session)
    }

    pub fn current_session(&self) -> Result<Option<Session>, AppError> {
        self.backend.sessions().load()
    }

    pub fn logout(&self) -> Result<(), AppError> {
        tracing::info!("Logging out");
        self.backend.sessions().clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, MockApiClient};
    use crate::session::SessionStore;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore, USER_DATA_KEY, USER_TOKEN_KEY};
    use std::sync::Arc;

    fn service(api: MockApiClient) -> (Arc<MemoryKeyValueStore>, AuthService) {
        let storage = Arc::new(MemoryKeyValueStore::new());
        let backend = Backend::new(Arc::new(api), SessionStore::new(storage.clone()));
        (storage, AuthService::new(backend))
    }

    #[tokio::test]
    async fn test_send_otp_normalizes_phone() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .withf(|r| {
                r.endpoint == Endpoint::SendOtp
                    && r.token.is_none()
                    && r.body == Some(json!({"no_hp": "6281234567890"}))
            })
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(json!({}))));
        let (_, auth) = service(api);

        assert_eq!(auth.send_otp("0812 3456 7890").await.unwrap(), "6281234567890");
    }

    #[tokio::test]
    async fn test_send_otp_rejects_bad_phone_without_calling() {
        let mut api = MockApiClient::new();
        api.expect_send().never();
        let (_, auth) = service(api);
        assert!(matches!(
            auth.send_otp("abc").await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_otp_persists_session() {
        let mut api = MockApiClient::new();
        api.expect_send().returning(|_| {
            Ok(ApiResponse::ok(json!({
                "token": "jwt-1",
                "user": {"no_hp": "6281234567890", "id_konsumen": 5, "status": "Y"}
            })))
        });
        let (storage, auth) = service(api);

        let session = auth.verify_otp("081234567890", "1234").await.unwrap();
        assert_eq!(session.token, "jwt-1");
        assert_eq!(session.profile.id_konsumen.as_deref(), Some("5"));
        assert_eq!(storage.get(USER_TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
        assert!(storage.get(USER_DATA_KEY).unwrap().is_some());
        assert_eq!(auth.current_session().unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_verify_otp_wrong_code_surfaces_message() {
        let mut api = MockApiClient::new();
        api.expect_send()
            .returning(|_| Ok(ApiResponse::failure("Kode OTP salah")));
        let (storage, auth) = service(api);

        let err = auth.verify_otp("081234567890", "0000").await.unwrap_err();
        assert_eq!(err.user_message(), "Kode OTP salah");
        assert_eq!(storage.get(USER_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_verify_otp_validates_code() {
        let mut api = MockApiClient::new();
        api.expect_send().never();
        let (_, auth) = service(api);
        assert!(auth.verify_otp("081234567890", "12").await.is_err());
        assert!(auth.verify_otp("081234567890", "12a4").await.is_err());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (storage, auth) = service(MockApiClient::new());
        storage.set(USER_TOKEN_KEY, "tok").unwrap();
        storage.set(USER_DATA_KEY, "{}").unwrap();
        auth.logout().unwrap();
        assert_eq!(storage.get(USER_TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_DATA_KEY).unwrap(), None);
    }
}
