// SPDX-License-Identifier: AGPL-3.0
// Mitra Shell - Platform stand-ins
//
// The navigator and push provider the mobile app gets from its UI
// framework and messaging SDK, reduced to what a terminal can do.

use crate::bridge::ShellEvent;
use async_channel::Sender;
use async_trait::async_trait;
use mitra_core::{
    AppError, NavigationTarget, Navigator, PermissionStatus, PushPayload, PushProvider,
    SessionStore,
};
use std::sync::Mutex;

/// Forwards every navigation to the shell's event channel
pub struct ChannelNavigator {
    events: Sender<ShellEvent>,
}

impl ChannelNavigator {
    pub fn new(events: Sender<ShellEvent>) -> Self {
        Self { events }
    }
}

impl Navigator for ChannelNavigator {
    fn replace(&self, target: &NavigationTarget) -> Result<(), AppError> {
        self.events
            .try_send(ShellEvent::Navigated(target.clone()))
            .map_err(|e| AppError::Navigation(e.to_string()))
    }
}

/// Push provider without a messaging service behind it.
///
/// The device token is a random id kept in storage, so it survives
/// restarts like a real registration token.
pub struct LocalPushProvider {
    sessions: SessionStore,
    permission: PermissionStatus,
    initial: Mutex<Option<PushPayload>>,
}

impl LocalPushProvider {
    pub fn new(
        sessions: SessionStore,
        permission: PermissionStatus,
        initial: Option<PushPayload>,
    ) -> Self {
        Self {
            sessions,
            permission,
            initial: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl PushProvider for LocalPushProvider {
    async fn request_permission(&self) -> Result<PermissionStatus, AppError> {
        Ok(self.permission)
    }

    async fn device_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.sessions.push_token()? {
            return Ok(token);
        }
        let token = uuid::Uuid::new_v4().to_string();
        tracing::debug!("Generated local push token {}", token);
        Ok(token)
    }

    async fn initial_notification(&self) -> Result<Option<PushPayload>, AppError> {
        let mut initial = self
            .initial
            .lock()
            .map_err(|_| AppError::Push("Initial notification lock poisoned".to_string()))?;
        Ok(initial.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mitra_core::{MemoryKeyValueStore, Route};
    use std::sync::Arc;

    fn sessions() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn test_navigator_forwards_target() {
        let (tx, rx) = async_channel::bounded(4);
        let navigator = ChannelNavigator::new(tx);
        navigator
            .replace(&NavigationTarget::new(Route::Balance))
            .unwrap();
        match rx.try_recv().unwrap() {
            ShellEvent::Navigated(target) => assert_eq!(target.route, Route::Balance),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_navigator_fails_when_closed() {
        let (tx, rx) = async_channel::bounded(1);
        drop(rx);
        let navigator = ChannelNavigator::new(tx);
        assert!(matches!(
            navigator.replace(&NavigationTarget::new(Route::Home)),
            Err(AppError::Navigation(_))
        ));
    }

    #[tokio::test]
    async fn test_device_token_reuses_stored_token() {
        let sessions = sessions();
        sessions.set_push_token("stored").unwrap();
        let provider = LocalPushProvider::new(sessions, PermissionStatus::Granted, None);
        assert_eq!(provider.device_token().await.unwrap(), "stored");
    }

    #[tokio::test]
    async fn test_initial_notification_is_taken_once() {
        let payload = PushPayload {
            title: "Order baru".to_string(),
            ..Default::default()
        };
        let provider =
            LocalPushProvider::new(sessions(), PermissionStatus::Granted, Some(payload.clone()));
        assert_eq!(provider.initial_notification().await.unwrap(), Some(payload));
        assert_eq!(provider.initial_notification().await.unwrap(), None);
    }
}
