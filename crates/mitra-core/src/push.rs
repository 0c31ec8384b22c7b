// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Push notification bridge
//
// Funnels the provider's three delivery channels into the app:
// foreground pushes go to the in-app banner, taps on background or
// cold-start notifications become scheme URIs for the deep link router.

use crate::api::{ApiClient, ApiRequest, Endpoint};
use crate::banner::InAppBanner;
use crate::deep_link::DeepLinkRouter;
use crate::events::{AppEvent, EventRegistry, Subscription};
use crate::routes::{self, NavigationTarget};
use crate::session::SessionStore;
use crate::types::{AppError, AppSettings};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Data field naming the route key to open
pub const NAVIGATE_TO_FIELD: &str = "navigate_to";

/// A provider-delivered notification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    notification: Option<RawNotification>,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawNotification {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

impl<'de> Deserialize<'de> for PushPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawPayload::deserialize(deserializer)?;
        let (title, body) = raw
            .notification
            .map(|n| (n.title.unwrap_or_default(), n.body.unwrap_or_default()))
            .unwrap_or_default();

        // Providers deliver data values as strings; tolerate scalars
        let data = raw
            .data
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Number(n) => Some((key, n.to_string())),
                Value::Bool(b) => Some((key, b.to_string())),
                _ => None,
            })
            .collect();

        Ok(Self { title, body, data })
    }
}

impl PushPayload {
    pub fn navigate_to(&self) -> Option<&str> {
        self.data.get(NAVIGATE_TO_FIELD).map(String::as_str)
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.data
            .get(routes::TRANSACTION_ID_PARAM)
            .map(String::as_str)
    }
}

/// How a payload reached the app
#[derive(Debug, Clone, PartialEq)]
pub enum PushDelivery {
    /// Received while the app is in the foreground
    Foreground(PushPayload),
    /// Tapped while the app was in the background
    Opened(PushPayload),
    /// Tapped while the app was not running
    ColdStart(PushPayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Provisional,
    Denied,
}

impl PermissionStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Granted | Self::Provisional)
    }
}

/// The platform push-messaging SDK
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus, AppError>;

    /// Device registration token
    async fn device_token(&self) -> Result<String, AppError>;

    /// Notification whose tap launched the app, if any
    async fn initial_notification(&self) -> Result<Option<PushPayload>, AppError>;
}

/// Result of bringing the bridge up
#[derive(Debug, Clone, PartialEq)]
pub struct PushStatus {
    pub permission: PermissionStatus,
    pub token: Option<String>,
}

/// Map a tapped payload to a navigation through the deep link router
pub fn route_payload(router: &DeepLinkRouter, payload: &PushPayload) -> Option<NavigationTarget> {
    let Some(key) = payload.navigate_to() else {
        tracing::debug!("Notification has no {} field", NAVIGATE_TO_FIELD);
        return None;
    };

    let Some(link) = routes::push_link(key, payload.transaction_id()) else {
        tracing::warn!("Unhandled notification route: {}", key);
        return None;
    };

    match router.scheme_url(&link) {
        Ok(url) => router.handle_url(url.as_str()),
        Err(e) => {
            tracing::error!("Failed to build link for {}: {}", key, e);
            None
        }
    }
}

pub struct PushBridge {
    provider: Arc<dyn PushProvider>,
    router: Arc<DeepLinkRouter>,
    banner: InAppBanner,
    sessions: SessionStore,
    api: Arc<dyn ApiClient>,
    events: EventRegistry<AppEvent>,
    cold_start_delay: Duration,
    device_name: String,
    prompt_shown: AtomicBool,
}

impl PushBridge {
    pub fn new(
        provider: Arc<dyn PushProvider>,
        router: Arc<DeepLinkRouter>,
        banner: InAppBanner,
        sessions: SessionStore,
        api: Arc<dyn ApiClient>,
        events: EventRegistry<AppEvent>,
        settings: &AppSettings,
    ) -> Self {
        let press_router = router.clone();
        banner.set_on_press(move |payload| {
            route_payload(&press_router, payload);
        });

        Self {
            provider,
            router,
            banner,
            sessions,
            api,
            events,
            cold_start_delay: Duration::from_millis(settings.cold_start_delay_ms),
            device_name: settings.device_name.clone(),
            prompt_shown: AtomicBool::new(false),
        }
    }

    pub fn banner(&self) -> &InAppBanner {
        &self.banner
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription<AppEvent>
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Request permission and register the device token.
    ///
    /// The notification that cold-started the app is left for
    /// [`replay_initial_notification`](Self::replay_initial_notification),
    /// which the caller runs once the session gate lets the user in.
    /// Denied permission is not an error: the user is prompted once and
    /// the app keeps working without pushes.
    pub async fn start(&self) -> Result<PushStatus, AppError> {
        let permission = self.provider.request_permission().await?;
        if !permission.is_authorized() {
            tracing::warn!("Push permission denied");
            self.prompt_permission_once();
            return Ok(PushStatus {
                permission,
                token: None,
            });
        }

        let token = match self.provider.device_token().await {
            Ok(token) => {
                self.handle_token(&token).await;
                Some(token)
            }
            Err(e) => {
                tracing::error!("Failed to get push token: {}", e);
                None
            }
        };

        Ok(PushStatus { permission, token })
    }

    /// Route the notification whose tap launched the app, if any
    pub async fn replay_initial_notification(&self) -> Option<NavigationTarget> {
        match self.provider.initial_notification().await {
            Ok(Some(payload)) => self.handle(PushDelivery::ColdStart(payload)).await,
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read initial notification: {}", e);
                None
            }
        }
    }

    /// Persist a (new) registration token and tell the backend about it
    pub async fn handle_token(&self, token: &str) {
        if let Err(e) = self.sessions.set_push_token(token) {
            tracing::error!("Failed to store push token: {}", e);
        }
        self.events
            .publish(&AppEvent::TokenRefreshed(token.to_string()));

        let session_token = match self.sessions.token() {
            Ok(Some(session_token)) => session_token,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Failed to read session token: {}", e);
                return;
            }
        };

        let request = ApiRequest::new(Endpoint::RegisterDeviceToken)
            .with_token(session_token)
            .with_body(json!({
                "fcm_token": token,
                "device_name": self.device_name,
            }));
        match self.api.send(request).await.and_then(|r| r.into_data()) {
            Ok(_) => tracing::info!("Push token registered"),
            Err(e) => tracing::warn!("Push token registration failed: {}", e),
        }
    }

    /// Dispatch one delivery; returns the navigation it caused, if any
    pub async fn handle(&self, delivery: PushDelivery) -> Option<NavigationTarget> {
        match delivery {
            PushDelivery::Foreground(payload) => {
                tracing::info!("Foreground notification: {}", payload.title);
                self.banner.show(payload);
                self.events.publish(&AppEvent::UnreadCountRefresh);
                None
            }
            PushDelivery::Opened(payload) => {
                tracing::info!("Notification opened from background");
                route_payload(&self.router, &payload)
            }
            PushDelivery::ColdStart(payload) => {
                tracing::info!(
                    "Notification opened app, routing in {:?}",
                    self.cold_start_delay
                );
                tokio::time::sleep(self.cold_start_delay).await;
                route_payload(&self.router, &payload)
            }
        }
    }

    fn prompt_permission_once(&self) {
        if !self.prompt_shown.swap(true, Ordering::SeqCst) {
            self.events.publish(&AppEvent::PermissionPromptRequested);
        }
    }
}
