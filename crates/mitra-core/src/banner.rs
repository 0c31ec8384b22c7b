// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - In-app notification banner
//
// Hidden -> Visible on a foreground push, Visible -> Hidden on timeout,
// dismiss or tap. A single auto-hide timer runs per show; showing again
// restarts it and the earlier timer expires without effect.

use crate::events::{EventRegistry, Subscription};
use crate::push::PushPayload;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What the banner currently displays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BannerState {
    pub visible: bool,
    pub title: String,
    pub body: String,
    pub payload: Option<PushPayload>,
}

/// Banner transitions, for the view layer
#[derive(Debug, Clone, PartialEq)]
pub enum BannerEvent {
    Shown { title: String, body: String },
    Hidden,
}

type PressHandler = Arc<dyn Fn(&PushPayload) + Send + Sync>;

struct Inner {
    state: BannerState,
    generation: u64,
    on_press: Option<PressHandler>,
}

#[derive(Clone)]
pub struct InAppBanner {
    inner: Arc<Mutex<Inner>>,
    hide_after: Duration,
    events: EventRegistry<BannerEvent>,
}

impl InAppBanner {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: BannerState::default(),
                generation: 0,
                on_press: None,
            })),
            hide_after,
            events: EventRegistry::new(),
        }
    }

    pub fn hide_after(&self) -> Duration {
        self.hide_after
    }

    /// Handler run with the payload when the banner is tapped
    pub fn set_on_press<F>(&self, handler: F)
    where
        F: Fn(&PushPayload) + Send + Sync + 'static,
    {
        self.lock().on_press = Some(Arc::new(handler));
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription<BannerEvent>
    where
        F: Fn(&BannerEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn state(&self) -> BannerState {
        self.lock().state.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.lock().state.visible
    }

    /// Show a payload and (re)start the auto-hide timer.
    ///
    /// Payloads with neither title nor body are ignored. Must be called
    /// from within a tokio runtime.
    pub fn show(&self, payload: PushPayload) -> bool {
        let title = payload.title.trim().to_string();
        let body = payload.body.trim().to_string();
        if title.is_empty() && body.is_empty() {
            tracing::debug!("Ignoring foreground push without title or body");
            return false;
        }

        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = BannerState {
                visible: true,
                title: title.clone(),
                body: body.clone(),
                payload: Some(payload),
            };
            inner.generation
        };
        self.events.publish(&BannerEvent::Shown { title, body });

        let banner = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(banner.hide_after).await;
            banner.hide_generation(generation);
        });

        true
    }

    /// Hide without running the press handler
    pub fn dismiss(&self) {
        let generation = self.lock().generation;
        self.hide_generation(generation);
    }

    /// Tap: hide immediately, then run the press handler with the payload
    pub fn press(&self) {
        let (payload, handler) = {
            let inner = self.lock();
            if !inner.state.visible {
                return;
            }
            (inner.state.payload.clone(), inner.on_press.clone())
        };

        self.dismiss();

        if let (Some(payload), Some(handler)) = (payload, handler) {
            handler(&payload);
        }
    }

    fn hide_generation(&self, generation: u64) {
        {
            let mut inner = self.lock();
            if inner.generation != generation || !inner.state.visible {
                return;
            }
            inner.state = BannerState::default();
        }
        self.events.publish(&BannerEvent::Hidden);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn payload(title: &str, body: &str) -> PushPayload {
        PushPayload {
            title: title.to_string(),
            body: body.to_string(),
            data: BTreeMap::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_hides_after_window() {
        let banner = InAppBanner::new(Duration::from_millis(5000));
        assert!(banner.show(payload("Order baru", "Ada order masuk")));
        assert!(banner.is_visible());
        assert_eq!(banner.state().title, "Order baru");

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(banner.is_visible());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!banner.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reshow_restarts_timer() {
        let banner = InAppBanner::new(Duration::from_millis(5000));
        banner.show(payload("Satu", ""));
        tokio::time::sleep(Duration::from_millis(3000)).await;
        banner.show(payload("Dua", ""));

        // first timer fires here and must not hide the second payload
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(banner.is_visible());
        assert_eq!(banner.state().title, "Dua");

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert!(!banner.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_payload_is_not_shown() {
        let banner = InAppBanner::new(Duration::from_millis(5000));
        assert!(!banner.show(payload("  ", "")));
        assert!(!banner.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_hides_then_runs_handler() {
        let banner = InAppBanner::new(Duration::from_millis(5000));
        let pressed = Arc::new(Mutex::new(Vec::new()));
        {
            let pressed = pressed.clone();
            let observer = banner.clone();
            banner.set_on_press(move |payload| {
                assert!(!observer.is_visible());
                pressed.lock().unwrap().push(payload.title.clone());
            });
        }

        banner.press();
        assert!(pressed.lock().unwrap().is_empty());

        banner.show(payload("Saldo masuk", "Rp 50.000"));
        banner.press();
        assert_eq!(*pressed.lock().unwrap(), vec!["Saldo masuk".to_string()]);
        assert!(!banner.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_event_fires_once() {
        let banner = InAppBanner::new(Duration::from_millis(1000));
        let events = Arc::new(Mutex::new(Vec::new()));
        let _subscription = {
            let events = events.clone();
            banner.subscribe(move |event| events.lock().unwrap().push(event.clone()))
        };

        banner.show(payload("Halo", "Dunia"));
        banner.dismiss();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                BannerEvent::Shown {
                    title: "Halo".to_string(),
                    body: "Dunia".to_string()
                },
                BannerEvent::Hidden,
            ]
        );
    }
}
