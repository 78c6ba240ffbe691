//! # Filesystem-backed key/value store
//!
//! [`FileStore`] is a [`KeyValueStore`] implementation that persists each
//! collection as a JSON file. It is used by native frontends to keep the
//! local wall and wishes across restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── familyverse_memorial_wall_v1.json
//! └── familyverse_birthday_wishes_v1_<member>.json
//! ```
//!
//! Keys keep `[A-Za-z0-9_-]` as is and percent-encode every other byte, so
//! no two keys share a file.
//! Writes go to a temporary file first and are renamed into place, so a
//! reader never sees a half-written collection.
//!
//! ## Platform data directories
//!
//! Use [`dirs::data_dir()`](https://docs.rs/dirs) to obtain a platform-appropriate base:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS | `~/Library/Application Support/memorial/` |
//! | Linux | `~/.local/share/memorial/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\memorial\` |
//!
//! Storage events only reach handles created with [`FileStore::new_context`]
//! in the same process; other processes are not notified.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::storage::{EventBus, KeyValueStore, StorageEvents};

/// Filesystem-backed KeyValueStore for desktop persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
    bus: EventBus,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self {
            base,
            bus: EventBus::new(),
        }
    }

    /// Another handle onto the same directory, acting as a separate context.
    pub fn new_context(&self) -> Self {
        Self {
            base: self.base.clone(),
            bus: self.bus.new_context(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.base.join(format!("{}.json", file_stem(key)))
    }
}

/// `[A-Za-z0-9_-]` pass through; every other byte becomes `%XX`. Distinct keys
/// always get distinct stems.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.item_path(key)).ok()
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.item_path(key);
        std::fs::create_dir_all(&self.base)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &value)?;
        std::fs::rename(&tmp, &path)?;

        self.bus.publish(key, Some(value));
        Ok(())
    }

    fn storage_events(&self) -> StorageEvents {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewWallEntry, NewWish};
    use crate::{WallStore, WishStore};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "memorial_{name}_{}_{}",
            std::process::id(),
            crate::models::generate_id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = temp_dir("roundtrip");

        let wall = WallStore::local_only(FileStore::new(dir.clone()));
        let created = wall
            .create(NewWallEntry::new("Jane", "Hello from FileStore!").unwrap())
            .await
            .unwrap();

        // Re-open from same directory
        let reopened = WallStore::local_only(FileStore::new(dir.clone()));
        let entries = reopened.list(10).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], created);

        // Cleanup
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = temp_dir("missing");
        let store = FileStore::new(dir);
        assert!(store.get_item("nothing_here").await.is_none());
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_base_dir() {
        let dir = temp_dir("escape");
        let store = FileStore::new(dir.clone());

        store
            .set_item("wishes_../../etc/passwd", "[]".to_string())
            .await
            .unwrap();

        let path = store.item_path("wishes_../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert_eq!(
            store.get_item("wishes_../../etc/passwd").await.as_deref(),
            Some("[]")
        );
        assert!(!path.with_extension("json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_stems_are_distinct() {
        assert_eq!(file_stem("familyverse_memorial_wall_v1"), "familyverse_memorial_wall_v1");
        assert_eq!(file_stem("ana.b"), "ana%2Eb");
        assert_eq!(file_stem("ana%2Eb"), "ana%252Eb");
        assert_eq!(file_stem("zoë"), "zo%C3%AB");
        assert_ne!(file_stem("ana.b"), file_stem("ana_b"));
    }

    #[tokio::test]
    async fn test_similar_member_ids_keep_separate_wishes() {
        let dir = temp_dir("members");
        let wishes = WishStore::new(FileStore::new(dir.clone()));

        wishes
            .create("ana.b", NewWish::new("Jane", "For ana.b").unwrap())
            .await
            .unwrap();

        assert!(wishes.list("ana_b").await.is_empty());
        assert_eq!(wishes.list("ana.b").await[0].text, "For ana.b");

        wishes
            .create("ana_b", NewWish::new("Sam", "For ana_b").unwrap())
            .await
            .unwrap();
        assert_eq!(wishes.list("ana.b").await.len(), 1);
        assert_eq!(wishes.list("ana_b").await[0].text, "For ana_b");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_contexts_share_directory_and_events() {
        let dir = temp_dir("contexts");
        let first = FileStore::new(dir.clone());
        let second = first.new_context();
        let mut second_events = second.storage_events();
        let mut first_events = first.storage_events();

        first.set_item("wall", "[1]".to_string()).await.unwrap();

        assert_eq!(second.get_item("wall").await.as_deref(), Some("[1]"));
        assert_eq!(second_events.try_recv().unwrap().key, "wall");
        assert!(first_events.try_recv().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
