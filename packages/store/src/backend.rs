//! # Wall backends
//!
//! [`WallBackend`] is the strategy interface behind [`crate::WallStore`]. It
//! has two implementations:
//!
//! | Backend | Storage | Ids assigned by |
//! |---------|---------|-----------------|
//! | [`LocalWall`] | A [`KeyValueStore`] under [`WALL_STORAGE_KEY`] | The client (UUID v4) |
//! | [`crate::RemoteWall`] | The HTTP API | The server |
//!
//! Backends report every failure as an `Err`; deciding what a failure means
//! (fall back, return `None`, surface it) is the job of the wrapper.

use std::future::Future;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::models::{NewWallEntry, WallEntry};
use crate::normalize::normalize_entry;
use crate::storage::KeyValueStore;

/// Local storage key of the wall collection.
pub const WALL_STORAGE_KEY: &str = "familyverse_memorial_wall_v1";

/// Async operations over the memorial wall.
pub trait WallBackend {
    fn list(&self, limit: usize) -> impl Future<Output = Result<Vec<WallEntry>, StoreError>>;

    fn create(
        &self,
        input: &NewWallEntry,
    ) -> impl Future<Output = Result<WallEntry, StoreError>>;

    /// Add one flower. `Ok(None)` means no entry has that id.
    fn add_flower(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<WallEntry>, StoreError>>;
}

/// The wall kept in local storage, newest entry first.
pub struct LocalWall<S> {
    storage: S,
}

impl<S: KeyValueStore> LocalWall<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn collection(&self) -> Collection<'_, S> {
        Collection::new(&self.storage, WALL_STORAGE_KEY)
    }
}

impl<S: KeyValueStore> WallBackend for LocalWall<S> {
    async fn list(&self, limit: usize) -> Result<Vec<WallEntry>, StoreError> {
        if !self.storage.is_available() {
            return Ok(Vec::new());
        }
        let mut entries = self.collection().load(normalize_entry).await;
        entries.truncate(limit);
        Ok(entries)
    }

    async fn create(&self, input: &NewWallEntry) -> Result<WallEntry, StoreError> {
        let entry = input.clone().into_local_entry();
        let collection = self.collection();

        let mut entries = collection.load(normalize_entry).await;
        entries.insert(0, entry.clone());
        collection.save(&entries).await?;

        tracing::debug!(id = %entry.id, "Stored wall entry locally");
        Ok(entry)
    }

    async fn add_flower(&self, id: &str) -> Result<Option<WallEntry>, StoreError> {
        let collection = self.collection();
        let mut entries = collection.load(normalize_entry).await;

        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        entry.flowers = entry.flowers.saturating_add(1);
        let updated = entry.clone();

        collection.save(&entries).await?;
        Ok(Some(updated))
    }
}
