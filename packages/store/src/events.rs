//! In-process change notification.
//!
//! [`ChangeNotifier`] is an explicit observer list: any number of listeners
//! subscribe and are called with a [`ChangeSignal`] after each successful
//! mutation of a wall or wish collection. Cross-context listeners use
//! [`crate::StorageEvents`] instead.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// "This collection may have changed." Carries only the collection's storage key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeSignal {
    pub key: String,
}

type Listener = Arc<dyn Fn(&ChangeSignal) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

#[derive(Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeSignal) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Call every listener registered at the time of the call.
    pub fn notify(&self, key: &str) {
        // Snapshot first so listeners can subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::debug!(key, listeners = listeners.len(), "Collection changed");
        let signal = ChangeSignal {
            key: key.to_string(),
        };
        for listener in listeners {
            listener(&signal);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Unsubscribes its listener when dropped.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Keep the listener registered for as long as the notifier lives.
    pub fn detach(mut self) {
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
