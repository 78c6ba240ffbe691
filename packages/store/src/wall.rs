//! # Wall store: remote-first with local fallback
//!
//! [`WallStore`] is the one place the fallback policy lives. It owns a
//! [`LocalWall`], an optional [`RemoteWall`] chosen from configuration at
//! construction time, and the in-process [`ChangeNotifier`].
//!
//! | Operation | No remote configured | Remote fails | Remote succeeds |
//! |-----------|----------------------|--------------|-----------------|
//! | [`list`](WallStore::list) | local entries | local entries | normalized remote entries |
//! | [`create`](WallStore::create) | stored locally, notified | stored locally, notified | remote entry, notified |
//! | [`add_flower`](WallStore::add_flower) | local +1 or `None` | `None`, nothing touched | remote entry, notified |
//!
//! Remote failures are logged and never returned to the caller. The only
//! errors `create` and `add_flower` return come from local persistence.
//! Local mutations reach other contexts through the storage handle's own
//! [`StorageEvents`]; remote successes only notify in-process listeners.

use crate::backend::{LocalWall, WallBackend, WALL_STORAGE_KEY};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::events::{ChangeNotifier, ChangeSignal, Subscription};
use crate::models::{NewWallEntry, WallEntry, MAX_IMAGES};
use crate::remote::RemoteWall;
use crate::storage::{KeyValueStore, StorageEvents};
use crate::upload::{UploadFile, Uploader};

/// Which tier the store treats as authoritative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreMode {
    LocalOnly,
    RemoteFirst,
}

pub struct WallStore<S: KeyValueStore> {
    local: LocalWall<S>,
    remote: Option<RemoteWall>,
    notifier: ChangeNotifier,
}

impl<S: KeyValueStore> WallStore<S> {
    /// Remote-first if `config` names an API base, local-only otherwise.
    pub fn new(config: &StoreConfig, storage: S) -> Result<Self, StoreError> {
        let remote = config.api_base()?.map(RemoteWall::new);
        Ok(Self::with_remote(storage, remote))
    }

    pub fn local_only(storage: S) -> Self {
        Self::with_remote(storage, None)
    }

    pub fn with_remote(storage: S, remote: Option<RemoteWall>) -> Self {
        tracing::debug!(
            remote = ?remote.as_ref().map(|r| r.base().as_str()),
            "Opening wall store"
        );
        Self {
            local: LocalWall::new(storage),
            remote,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Share a notifier with other stores (e.g. a [`crate::WishStore`]).
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn mode(&self) -> StoreMode {
        match self.remote {
            Some(_) => StoreMode::RemoteFirst,
            None => StoreMode::LocalOnly,
        }
    }

    pub fn storage_key(&self) -> &'static str {
        WALL_STORAGE_KEY
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Up to `limit` entries, in the order the source returned them.
    pub async fn list(&self, limit: usize) -> Vec<WallEntry> {
        if let Some(remote) = &self.remote {
            match remote.list(limit).await {
                Ok(entries) => return entries,
                Err(e) => tracing::warn!(error = %e, "Remote wall unavailable, reading local wall"),
            }
        }
        self.local.list(limit).await.unwrap_or_default()
    }

    /// Store a new entry, remotely if possible.
    pub async fn create(&self, input: NewWallEntry) -> Result<WallEntry, StoreError> {
        if let Some(remote) = &self.remote {
            match remote.create(&input).await {
                Ok(entry) => {
                    self.notifier.notify(WALL_STORAGE_KEY);
                    return Ok(entry);
                }
                Err(e) => tracing::warn!(error = %e, "Remote create failed, storing entry locally"),
            }
        }

        let entry = self.local.create(&input).await?;
        self.notifier.notify(WALL_STORAGE_KEY);
        Ok(entry)
    }

    /// Add one flower to an entry. `None` if the entry was not found or the
    /// remote refused; remote failures never fall back to local storage.
    pub async fn add_flower(&self, id: &str) -> Result<Option<WallEntry>, StoreError> {
        let updated = match &self.remote {
            Some(remote) => match remote.add_flower(id).await {
                Ok(updated) => updated,
                Err(e) => {
                    tracing::warn!(id, error = %e, "Remote flower failed");
                    None
                }
            },
            None => self.local.add_flower(id).await?,
        };

        if updated.is_some() {
            self.notifier.notify(WALL_STORAGE_KEY);
        }
        Ok(updated)
    }

    /// The wall's submit flow: validate, upload up to [`MAX_IMAGES`] images,
    /// then create. Upload failures are returned and nothing is created.
    pub async fn post(
        &self,
        author: &str,
        message: &str,
        files: &[UploadFile],
        uploader: &Uploader,
    ) -> Result<WallEntry, StoreError> {
        let input = NewWallEntry::new(author, message)?;

        let picked: Vec<UploadFile> = files
            .iter()
            .filter(|f| f.is_image())
            .take(MAX_IMAGES)
            .cloned()
            .collect();
        if picked.len() < files.len() {
            tracing::debug!(
                picked = picked.len(),
                offered = files.len(),
                "Skipped files that are not images or over the limit"
            );
        }

        let images = uploader.upload_all(&picked).await?;
        self.create(input.with_images(images)).await
    }

    /// Listen for changes made through this process.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeSignal) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Listen for local writes made by other contexts.
    pub fn storage_events(&self) -> StorageEvents {
        self.local.storage().storage_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn entry(author: &str, message: &str) -> NewWallEntry {
        NewWallEntry::new(author, message).unwrap()
    }

    #[tokio::test]
    async fn test_local_mode_create_then_list() {
        let wall = WallStore::local_only(MemoryStore::new());
        assert_eq!(wall.mode(), StoreMode::LocalOnly);

        let created = wall.create(entry("Jane", "Miss you")).await.unwrap();
        assert_eq!(created.author, "Jane");
        assert_eq!(created.flowers, 0);

        let listed = wall.list(10).await;
        assert_eq!(listed[0], created);
    }

    #[tokio::test]
    async fn test_newest_entry_listed_first() {
        let wall = WallStore::local_only(MemoryStore::new());
        wall.create(entry("A", "older message")).await.unwrap();
        let newest = wall.create(entry("B", "newer message")).await.unwrap();

        assert_eq!(wall.list(10).await[0].id, newest.id);
    }

    #[tokio::test]
    async fn test_blank_author_is_anonymous() {
        let wall = WallStore::local_only(MemoryStore::new());
        let created = wall.create(entry("   ", "Forever missed")).await.unwrap();
        assert_eq!(created.author, "Anonymous");
    }

    #[tokio::test]
    async fn test_created_at_is_canonical() {
        let wall = WallStore::local_only(MemoryStore::new());
        let created = wall.create(entry("Jane", "Miss you")).await.unwrap();

        let text = crate::normalize::format_timestamp(&created.created_at);
        assert!(text.ends_with('Z'));
        assert_eq!(
            crate::normalize::parse_timestamp(&serde_json::Value::String(text)),
            created.created_at
        );
    }

    #[tokio::test]
    async fn test_flowers_increase_by_one_each_time() {
        let wall = WallStore::local_only(MemoryStore::new());
        let created = wall.create(entry("Jane", "Miss you")).await.unwrap();

        let once = wall.add_flower(&created.id).await.unwrap().unwrap();
        assert_eq!(once.flowers, 1);
        assert_eq!(
            WallEntry {
                flowers: 0,
                ..once.clone()
            },
            created
        );

        let twice = wall.add_flower(&created.id).await.unwrap().unwrap();
        assert_eq!(twice.flowers, 2);
        assert_eq!(wall.list(1).await[0].flowers, 2);
    }

    #[tokio::test]
    async fn test_flower_on_unknown_id() {
        let wall = WallStore::local_only(MemoryStore::new());
        let created = wall.create(entry("Jane", "Miss you")).await.unwrap();
        let before = wall.list(10).await;

        let notified = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&notified);
        let _sub = wall.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(wall.add_flower("missing").await.unwrap().is_none());
        assert_eq!(wall.list(10).await, before);
        assert_eq!(before[0].id, created.id);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_message_never_reaches_store() {
        let storage = MemoryStore::new();
        let wall = WallStore::local_only(storage.clone());
        let uploader = Uploader::new(None, None);

        let err = wall.post("Jane", " x ", &[], &uploader).await.unwrap_err();
        assert!(matches!(err, StoreError::MessageTooShort { min: 2 }));
        assert!(wall.list(10).await.is_empty());
        assert!(storage.get_item(WALL_STORAGE_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_local_mutations_notify_both_channels() {
        let storage = MemoryStore::new();
        let wall = WallStore::local_only(storage.clone());
        let other_tab = WallStore::local_only(storage.new_context());

        let signals = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&signals);
        let _sub = wall.subscribe(move |signal| {
            assert_eq!(signal.key, WALL_STORAGE_KEY);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let mut own_events = wall.storage_events();
        let mut other_events = other_tab.storage_events();

        let created = wall.create(entry("Jane", "Miss you")).await.unwrap();
        wall.add_flower(&created.id).await.unwrap();

        assert_eq!(signals.load(Ordering::SeqCst), 2);
        assert!(own_events.try_recv().is_none());
        assert_eq!(other_events.try_recv().unwrap().key, WALL_STORAGE_KEY);
        assert_eq!(other_events.try_recv().unwrap().key, WALL_STORAGE_KEY);
        assert!(other_events.try_recv().is_none());

        // The other tab reads the same wall.
        assert_eq!(other_tab.list(10).await[0].flowers, 1);
    }

    #[tokio::test]
    async fn test_shared_notifier() {
        let notifier = ChangeNotifier::new();
        let wall = WallStore::local_only(MemoryStore::new()).with_notifier(notifier.clone());

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let _sub = notifier.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        wall.create(entry("Jane", "Miss you")).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mode_follows_config() {
        let local = WallStore::new(&StoreConfig::local_only(), MemoryStore::new()).unwrap();
        assert_eq!(local.mode(), StoreMode::LocalOnly);

        let remote = WallStore::new(
            &StoreConfig::local_only().with_api_base("https://memorial.example.org/"),
            MemoryStore::new(),
        )
        .unwrap();
        assert_eq!(remote.mode(), StoreMode::RemoteFirst);

        let broken = WallStore::new(
            &StoreConfig::local_only().with_api_base("::nope::"),
            MemoryStore::new(),
        );
        assert!(broken.is_err());
    }
}
