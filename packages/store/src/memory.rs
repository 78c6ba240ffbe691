use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::storage::{EventBus, KeyValueStore, StorageEvents};

/// In-memory KeyValueStore for testing and ephemeral sessions.
///
/// Clones share data *and* context. Use [`MemoryStore::new_context`] for a
/// handle that behaves like another tab on the same storage.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
    bus: EventBus,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: Arc::default(),
            bus: EventBus::new(),
        }
    }

    /// Another handle onto the same data, acting as a separate context.
    pub fn new_context(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            bus: self.bus.new_context(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.clone());
        self.bus.publish(key, Some(value));
        Ok(())
    }

    fn storage_events(&self) -> StorageEvents {
        self.bus.subscribe()
    }
}
