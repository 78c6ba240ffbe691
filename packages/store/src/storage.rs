//! # Storage handles: the local persistence seam
//!
//! [`KeyValueStore`] is modelled on browser local storage: string keys,
//! string values, one value per logical collection. The wall and wish stores
//! are generic over it so the same logic runs against an in-memory map
//! ([`crate::MemoryStore`]), a directory of JSON files ([`crate::FileStore`])
//! or `window.localStorage` (`LocalStorageStore`, web only).
//!
//! ## Cross-context events
//!
//! Every handle belongs to a *context*, the equivalent of a browser tab. A
//! successful `set_item` publishes a [`StorageEvent`] to every *other*
//! context sharing the same underlying storage; the writing context does not
//! see its own writes on this channel (same-context listeners use
//! [`crate::ChangeNotifier`] instead). [`StorageEvents`] is the receiving end.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::error::StoreError;

/// Buffered events per receiver before a slow receiver starts lagging.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// Async interface for string-keyed local persistence.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> impl Future<Output = Option<String>>;

    fn set_item(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>>;

    /// Events written by other contexts sharing this storage.
    fn storage_events(&self) -> StorageEvents;

    /// Whether persisted storage exists at all (false outside a browser window).
    fn is_available(&self) -> bool {
        true
    }
}

/// A write observed from another context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct Envelope {
    pub origin: ContextId,
    pub event: StorageEvent,
}

/// Identifies the context a storage handle writes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Receiving end of the cross-context channel.
pub struct StorageEvents {
    rx: broadcast::Receiver<Envelope>,
    own: Option<ContextId>,
}

impl StorageEvents {
    /// `own` is the receiving context; its own writes are skipped.
    pub(crate) fn new(rx: broadcast::Receiver<Envelope>, own: Option<ContextId>) -> Self {
        Self { rx, own }
    }

    /// Wait for the next event from another context. `None` once the
    /// storage has been dropped.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if Some(envelope.origin) == self.own => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Storage event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-delivered event, without waiting.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) if Some(envelope.origin) == self.own => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Storage event receiver lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

/// Shared publishing half used by the native stores.
#[derive(Clone, Debug)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<Envelope>,
    context: ContextId,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tx,
            context: ContextId::next(),
        }
    }

    /// Same channel, new context.
    pub fn new_context(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            context: ContextId::next(),
        }
    }

    pub fn publish(&self, key: &str, new_value: Option<String>) {
        // No receivers is fine; nobody is listening yet.
        let _ = self.tx.send(Envelope {
            origin: self.context,
            event: StorageEvent {
                key: key.to_string(),
                new_value,
            },
        });
    }

    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents::new(self.tx.subscribe(), Some(self.context))
    }
}
