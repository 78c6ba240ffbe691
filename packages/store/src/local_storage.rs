//! # Browser local storage: web-side persistence
//!
//! [`LocalStorageStore`] is the [`KeyValueStore`] implementation used on the
//! **web platform**. It reads and writes `window.localStorage` through
//! [`web_sys::Storage`], so the wall survives reloads on the current device.
//!
//! ## Cross-tab events
//!
//! The browser fires a `storage` event in every *other* tab of the same
//! origin when a key changes, never in the tab that wrote it. One `storage`
//! listener is installed per page, the first time a store is created, and
//! every store on the page shares its channel. Events are forwarded into
//! [`StorageEvents`] receivers unchanged, which gives the same "other
//! contexts only" semantics as the native stores.
//!
//! ## Availability
//!
//! Outside a window (workers, server rendering) or when the browser refuses
//! storage access (some private modes), [`KeyValueStore::is_available`]
//! reports `false`, reads return `None`, and writes fail with
//! [`StoreError::Storage`].

use tokio::sync::broadcast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::error::StoreError;
use crate::storage::{
    ContextId, Envelope, KeyValueStore, StorageEvent, StorageEvents, EVENT_CAPACITY,
};

/// `window.localStorage`-backed KeyValueStore for the web platform.
#[derive(Clone)]
pub struct LocalStorageStore {
    events: broadcast::Sender<Envelope>,
}

thread_local! {
    static PAGE_EVENTS: broadcast::Sender<Envelope> = listen_for_storage_events();
}

/// Bridge the window's `storage` event into a broadcast channel. Runs once
/// per page.
fn listen_for_storage_events() -> broadcast::Sender<Envelope> {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    if let Some(window) = web_sys::window() {
        let tx = events.clone();
        let origin = ContextId::next();
        let on_storage = Closure::<dyn FnMut(web_sys::StorageEvent)>::new(
            move |event: web_sys::StorageEvent| {
                let Some(key) = event.key() else {
                    // `localStorage.clear()` from another tab.
                    return;
                };
                let _ = tx.send(Envelope {
                    origin,
                    event: StorageEvent {
                        key,
                        new_value: event.new_value(),
                    },
                });
            },
        );
        if let Err(e) = window
            .add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())
        {
            tracing::warn!(error = ?e, "Could not listen for storage events");
        }
        // Lives as long as the page.
        on_storage.forget();
    }

    events
}

impl LocalStorageStore {
    pub fn new() -> Self {
        Self {
            events: PAGE_EVENTS.with(broadcast::Sender::clone),
        }
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl Default for LocalStorageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for LocalStorageStore {
    async fn get_item(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let storage = Self::storage()
            .ok_or_else(|| StoreError::Storage("localStorage is unavailable".to_string()))?;
        storage
            .set_item(key, &value)
            .map_err(|e| StoreError::Storage(format!("{e:?}")))
    }

    fn storage_events(&self) -> StorageEvents {
        // Every forwarded event comes from another tab already.
        StorageEvents::new(self.events.subscribe(), None)
    }

    fn is_available(&self) -> bool {
        Self::storage().is_some()
    }
}
