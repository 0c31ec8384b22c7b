// SPDX-License-Identifier: AGPL-3.0
// Mitra Core - Publish/subscribe registry
//
// Listeners register for a typed event stream and get a handle back.
// Dropping or unsubscribing the handle removes the listener. Publishes
// that start afterwards skip it; a publish already running on another
// thread may still deliver to it once.

use std::sync::{Arc, Mutex, Weak};

/// Signals broadcast to views listening on the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A foreground push arrived; unread counters should be reloaded
    UnreadCountRefresh,
    /// Push registration token changed
    TokenRefreshed(String),
    /// Push permission was denied; ask the user to open system settings
    PermissionPromptRequested,
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// Registry of listeners for events of type `T`
pub struct EventRegistry<T> {
    inner: Arc<Mutex<Listeners<T>>>,
}

impl<T: 'static> EventRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener; it stays registered while the handle lives
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every listener in subscription order
    pub fn publish(&self, event: &T) {
        let snapshot: Vec<(u64, Listener<T>)> = lock(&self.inner)
            .entries
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();

        for (id, listener) in snapshot {
            // Skip listeners removed by an earlier listener in this round
            let registered = lock(&self.inner).entries.iter().any(|(other, _)| *other == id);
            if registered {
                listener(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

impl<T: 'static> Default for EventRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Handle to a registered listener
pub struct Subscription<T> {
    id: u64,
    registry: Weak<Mutex<Listeners<T>>>,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    /// Keep the listener registered for the lifetime of the registry
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock<T>(inner: &Mutex<Listeners<T>>) -> std::sync::MutexGuard<'_, Listeners<T>> {
    // Listeners run outside the lock; a poisoned list is still consistent
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
