//! A JSON array stored under one key of a [`KeyValueStore`].

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::storage::KeyValueStore;

pub(crate) struct Collection<'a, S> {
    storage: &'a S,
    key: &'a str,
}

impl<'a, S: KeyValueStore> Collection<'a, S> {
    pub fn new(storage: &'a S, key: &'a str) -> Self {
        Self { storage, key }
    }

    /// Load and normalize every record; unreadable content is an empty collection.
    pub async fn load<T>(&self, normalize: impl Fn(&Value) -> Option<T>) -> Vec<T> {
        let Some(raw) = self.storage.get_item(self.key).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items.iter().filter_map(normalize).collect(),
            Ok(_) => {
                tracing::warn!(key = self.key, "Stored collection is not an array, ignoring it");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(key = self.key, error = %e, "Stored collection is not valid JSON, ignoring it");
                Vec::new()
            }
        }
    }

    pub async fn save<T: Serialize>(&self, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        self.storage.set_item(self.key, raw).await
    }
}
