// SPDX-License-Identifier: AGPL-3.0
// Mitra Shell - App Bridge
//
// Bridges the async core (session gate, deep links, push) with the
// blocking command line.

use crate::platform::{ChannelNavigator, LocalPushProvider};
use crate::state::AppState;
use async_channel::{Receiver, Sender};
use mitra_core::{
    AppError, AppEvent, BannerEvent, DeepLinkRouter, EventRegistry, GateDecision,
    InAppBanner, NavigationTarget, PermissionStatus, PushBridge, PushDelivery, PushPayload,
    SessionGate,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// How the platform starts the app
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub permission: PermissionStatus,
    pub initial_notification: Option<PushPayload>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            initial_notification: None,
        }
    }
}

/// Commands that can be sent to the app
#[derive(Debug)]
pub enum AppCommand {
    Launch {
        initial_url: Option<String>,
        reply: Sender<GateDecision>,
    },
    OpenUrl {
        uri: String,
        reply: Sender<Option<NavigationTarget>>,
    },
    Push {
        delivery: PushDelivery,
        reply: Sender<Option<NavigationTarget>>,
    },
    PressBanner,
    Quit {
        reply: Sender<()>,
    },
}

/// Everything the view layer would react to
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    Navigated(NavigationTarget),
    Banner(BannerEvent),
    App(AppEvent),
}

/// Bridge between the command line and the async core
pub struct AppBridge {
    command_tx: Sender<AppCommand>,
    event_rx: Receiver<ShellEvent>,
    runtime: Runtime,
}

impl AppBridge {
    pub fn new(state: &AppState, options: LaunchOptions) -> Result<Self, AppError> {
        let (command_tx, command_rx) = async_channel::bounded::<AppCommand>(32);
        let (event_tx, event_rx) = async_channel::bounded::<ShellEvent>(64);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| AppError::InvalidConfig(format!("Failed to create Tokio runtime: {}", e)))?;

        let navigator = Arc::new(ChannelNavigator::new(event_tx.clone()));
        let router = Arc::new(DeepLinkRouter::from_settings(&state.config, navigator.clone()));
        let gate = SessionGate::new(state.sessions.clone(), state.api.clone(), navigator);
        let provider = Arc::new(LocalPushProvider::new(
            state.sessions.clone(),
            options.permission,
            options.initial_notification,
        ));
        let push = PushBridge::new(
            provider,
            router.clone(),
            InAppBanner::new(Duration::from_millis(state.config.banner_hide_ms)),
            state.sessions.clone(),
            state.api.clone(),
            EventRegistry::new(),
            &state.config,
        );

        runtime.spawn(async move {
            Self::run_app(gate, router, push, command_rx, event_tx).await;
        });

        Ok(Self {
            command_tx,
            event_rx,
            runtime,
        })
    }

    async fn run_app(
        gate: SessionGate,
        router: Arc<DeepLinkRouter>,
        push: PushBridge,
        command_rx: Receiver<AppCommand>,
        event_tx: Sender<ShellEvent>,
    ) {
        let banner_tx = event_tx.clone();
        let _banner_sub = push.banner().subscribe(move |event| {
            let _ = banner_tx.try_send(ShellEvent::Banner(event.clone()));
        });
        let app_tx = event_tx;
        let _app_sub = push.subscribe(move |event| {
            let _ = app_tx.try_send(ShellEvent::App(event.clone()));
        });

        while let Ok(cmd) = command_rx.recv().await {
            match cmd {
                AppCommand::Launch { initial_url, reply } => {
                    let decision = gate.run().await;
                    if let Err(e) = push.start().await {
                        tracing::error!("Push setup failed: {}", e);
                    }
                    // Links and tapped notifications only apply once the
                    // gate let the user in
                    if decision == GateDecision::Main {
                        router.handle_initial_url(initial_url.as_deref());
                        push.replay_initial_notification().await;
                    }
                    let _ = reply.send(decision).await;
                }
                AppCommand::OpenUrl { uri, reply } => {
                    let target = router.handle_url(&uri);
                    let _ = reply.send(target).await;
                }
                AppCommand::Push { delivery, reply } => {
                    let target = push.handle(delivery).await;
                    let _ = reply.send(target).await;
                }
                AppCommand::PressBanner => {
                    push.banner().press();
                }
                AppCommand::Quit { reply } => {
                    let _ = reply.send(()).await;
                    break;
                }
            }
        }
        tracing::debug!("App loop stopped");
    }

    pub fn event_receiver(&self) -> Receiver<ShellEvent> {
        self.event_rx.clone()
    }

    /// Run a future on the bridge runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> AppCommand) -> Result<T, AppError> {
        let (reply_tx, reply_rx) = async_channel::bounded(1);
        self.command_tx
            .send_blocking(command(reply_tx))
            .map_err(|e| AppError::Navigation(format!("App is not running: {}", e)))?;
        reply_rx
            .recv_blocking()
            .map_err(|e| AppError::Navigation(format!("App stopped before replying: {}", e)))
    }

    pub fn launch(&self, initial_url: Option<String>) -> Result<GateDecision, AppError> {
        self.request(|reply| AppCommand::Launch { initial_url, reply })
    }

    pub fn open_url(&self, uri: String) -> Result<Option<NavigationTarget>, AppError> {
        self.request(|reply| AppCommand::OpenUrl { uri, reply })
    }

    pub fn push(&self, delivery: PushDelivery) -> Result<Option<NavigationTarget>, AppError> {
        self.request(|reply| AppCommand::Push { delivery, reply })
    }

    pub fn press_banner(&self) -> Result<(), AppError> {
        self.command_tx
            .send_blocking(AppCommand::PressBanner)
            .map_err(|e| AppError::Navigation(format!("App is not running: {}", e)))
    }

    /// Stop the app loop and the runtime; pending timers are dropped
    pub fn shutdown(self) {
        if let Err(e) = self.request(|reply| AppCommand::Quit { reply }) {
            tracing::debug!("{}", e);
        }
        self.runtime.shutdown_timeout(Duration::from_secs(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitra_core::{
        ApiClient, ApiRequest, ApiResponse, AppSettings, KeyValueStore, MemoryKeyValueStore,
        Route, SessionStore,
    };
    use std::sync::Arc;

    struct OfflineApi;

    #[async_trait::async_trait]
    impl ApiClient for OfflineApi {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, AppError> {
            Err(AppError::Network("offline".to_string()))
        }
    }

    fn state(logged_in: bool) -> AppState {
        let storage = Arc::new(MemoryKeyValueStore::new());
        if logged_in {
            storage.set(mitra_core::storage::USER_TOKEN_KEY, "tok").unwrap();
        }
        let config = AppSettings {
            cold_start_delay_ms: 10,
            ..AppSettings::default()
        };
        AppState::with_parts(config, SessionStore::new(storage), Arc::new(OfflineApi))
    }

    fn navigations(bridge: &AppBridge) -> Vec<Route> {
        let rx = bridge.event_receiver();
        let mut routes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ShellEvent::Navigated(target) = event {
                routes.push(target.route);
            }
        }
        routes
    }

    #[test]
    fn test_launch_without_session_goes_to_login() {
        let bridge = AppBridge::new(&state(false), LaunchOptions::default()).unwrap();
        let decision = bridge.launch(Some("mitra-klikquick://balance".to_string())).unwrap();
        assert_eq!(decision, GateDecision::Authenticate);
        assert_eq!(navigations(&bridge), vec![Route::Login]);
        bridge.shutdown();
    }

    #[test]
    fn test_launch_with_token_applies_initial_url() {
        let bridge = AppBridge::new(&state(true), LaunchOptions::default()).unwrap();
        let decision = bridge.launch(Some("mitra-klikquick://balance".to_string())).unwrap();
        assert_eq!(decision, GateDecision::Main);
        assert_eq!(navigations(&bridge), vec![Route::Home, Route::Balance]);
        bridge.shutdown();
    }

    fn saldo_notification() -> LaunchOptions {
        LaunchOptions {
            permission: PermissionStatus::Granted,
            initial_notification: Some(
                serde_json::from_str(r#"{"data":{"navigate_to":"saldo"}}"#).unwrap(),
            ),
        }
    }

    #[test]
    fn test_cold_start_notification_waits_for_session() {
        let bridge = AppBridge::new(&state(false), saldo_notification()).unwrap();
        let decision = bridge.launch(None).unwrap();
        assert_eq!(decision, GateDecision::Authenticate);
        assert_eq!(navigations(&bridge), vec![Route::Login]);
        bridge.shutdown();
    }

    #[test]
    fn test_cold_start_notification_replayed_after_gate() {
        let bridge = AppBridge::new(&state(true), saldo_notification()).unwrap();
        let decision = bridge.launch(None).unwrap();
        assert_eq!(decision, GateDecision::Main);
        assert_eq!(navigations(&bridge), vec![Route::Home, Route::Balance]);
        bridge.shutdown();
    }

    #[test]
    fn test_open_url_and_opened_push() {
        let bridge = AppBridge::new(&state(true), LaunchOptions::default()).unwrap();
        let target = bridge
            .open_url("mitra-klikquick://live-order/987".to_string())
            .unwrap()
            .unwrap();
        assert_eq!(target.route, Route::LiveOrderDetail);

        let payload: PushPayload =
            serde_json::from_str(r#"{"data":{"navigate_to":"saldo"}}"#).unwrap();
        let target = bridge.push(PushDelivery::Opened(payload)).unwrap().unwrap();
        assert_eq!(target.route, Route::Balance);
        bridge.shutdown();
    }

    #[test]
    fn test_denied_permission_requests_prompt() {
        let options = LaunchOptions {
            permission: PermissionStatus::Denied,
            initial_notification: None,
        };
        let bridge = AppBridge::new(&state(false), options).unwrap();
        bridge.launch(None).unwrap();
        let events: Vec<ShellEvent> = std::iter::from_fn(|| bridge.event_receiver().try_recv().ok())
            .collect();
        assert!(events.contains(&ShellEvent::App(AppEvent::PermissionPromptRequested)));
        bridge.shutdown();
    }
}
