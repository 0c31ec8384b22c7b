// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Session gate
//
// Runs once at startup and picks the first screen: login, profile
// completion or the main shell. Nothing else is reachable before it.

use crate::api::{ApiClient, ApiRequest, Endpoint};
use crate::deep_link::Navigator;
use crate::routes::{NavigationTarget, Route};
use crate::session::{SessionStore, UserProfile, INACTIVE_FLAG};
use crate::types::AppError;
use serde_json::{json, Value};
use std::sync::Arc;

/// Param carrying the phone number to the profile completion screen
pub const PHONE_PARAM: &str = "no_hp";
/// Param carrying the persisted profile JSON, verbatim
pub const USER_DATA_PARAM: &str = "user_data";

/// Where the gate sent the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Status check failed unexpectedly; stay on the loading screen
    Loading,
    Authenticate,
    CompleteProfile { no_hp: String, user_data: String },
    Main,
}

impl GateDecision {
    pub fn target(&self) -> Option<NavigationTarget> {
        match self {
            Self::Loading => None,
            Self::Authenticate => Some(NavigationTarget::new(Route::Login)),
            Self::CompleteProfile { no_hp, user_data } => Some(
                NavigationTarget::new(Route::CompleteProfile)
                    .with_param(PHONE_PARAM, no_hp.clone())
                    .with_param(USER_DATA_PARAM, user_data.clone()),
            ),
            Self::Main => Some(NavigationTarget::new(Route::Home)),
        }
    }
}

pub struct SessionGate {
    sessions: SessionStore,
    api: Arc<dyn ApiClient>,
    navigator: Arc<dyn Navigator>,
}

impl SessionGate {
    pub fn new(
        sessions: SessionStore,
        api: Arc<dyn ApiClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            sessions,
            api,
            navigator,
        }
    }

    /// Decide the first screen and navigate there.
    ///
    /// No retries: an unexpected failure leaves the app on `Loading`.
    pub async fn run(&self) -> GateDecision {
        let decision = self.decide().await;
        tracing::info!("Session gate decision: {:?}", decision);

        if let Some(target) = decision.target() {
            if let Err(e) = self.navigator.replace(&target) {
                tracing::error!("Session gate navigation failed: {}", e);
            }
        }
        decision
    }

    async fn decide(&self) -> GateDecision {
        let StoredSession {
            token,
            raw_profile,
            profile,
        } = match self.read_session() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Failed to read session: {}", e);
                return GateDecision::Loading;
            }
        };

        if let (Some(raw_profile), Some(profile)) = (raw_profile, profile) {
            let mut request = ApiRequest::new(Endpoint::DriverStatus).with_body(json!({
                "no_hp": profile.no_hp,
                "id_konsumen": profile.id_konsumen,
            }));
            if let Some(token) = &token {
                request = request.with_token(token.clone());
            }

            let response = match self.api.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("Driver status check failed: {}", e);
                    return GateDecision::Loading;
                }
            };

            if !response.success {
                tracing::warn!(
                    "Session rejected by server: {}",
                    response.message.as_deref().unwrap_or("no message")
                );
                if let Err(e) = self.sessions.clear() {
                    tracing::error!("Failed to clear session: {}", e);
                }
                return GateDecision::Authenticate;
            }

            let inactive = response
                .data
                .as_ref()
                .and_then(inactive_flag)
                .unwrap_or_else(|| profile.is_inactive());
            if inactive {
                return GateDecision::CompleteProfile {
                    no_hp: profile.no_hp,
                    user_data: raw_profile,
                };
            }
        }

        if token.is_some() {
            GateDecision::Main
        } else {
            GateDecision::Authenticate
        }
    }

    fn read_session(&self) -> Result<StoredSession, AppError> {
        Ok(StoredSession {
            token: self.sessions.token()?,
            raw_profile: self.sessions.raw_profile()?,
            profile: self.sessions.profile()?,
        })
    }
}

struct StoredSession {
    token: Option<String>,
    raw_profile: Option<String>,
    profile: Option<UserProfile>,
}

/// Whether a status payload marks the profile inactive, if it says
fn inactive_flag(data: &Value) -> Option<bool> {
    // A null or numeric status says nothing; fall through to is_active
    ["status", "is_active"]
        .iter()
        .find_map(|field| match data.get(*field)? {
            Value::String(flag) => Some(flag == INACTIVE_FLAG),
            Value::Bool(active) => Some(!active),
            _ => None,
        })
}
