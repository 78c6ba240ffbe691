//! Birthday wishes, one local collection per family member.
//!
//! The remote API has no wish endpoints, so wishes always live in the local
//! tier under [`wishes_key`]. Like the wall, new wishes are prepended and
//! every successful write notifies in-process listeners with the member's key.

use crate::collection::Collection;
use crate::error::StoreError;
use crate::events::{ChangeNotifier, ChangeSignal, Subscription};
use crate::models::{BirthdayWish, NewWish};
use crate::normalize::normalize_wish;
use crate::storage::{KeyValueStore, StorageEvents};

const WISHES_KEY_PREFIX: &str = "familyverse_birthday_wishes_v1_";

/// Local storage key of one member's wishes.
pub fn wishes_key(member_id: &str) -> String {
    format!("{WISHES_KEY_PREFIX}{member_id}")
}

/// The member a wish storage key belongs to, if it is one.
pub fn member_for_key(key: &str) -> Option<&str> {
    key.strip_prefix(WISHES_KEY_PREFIX)
}

pub struct WishStore<S: KeyValueStore> {
    storage: S,
    notifier: ChangeNotifier,
}

impl<S: KeyValueStore> WishStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// A member's wishes, newest first.
    pub async fn list(&self, member_id: &str) -> Vec<BirthdayWish> {
        if !self.storage.is_available() {
            return Vec::new();
        }
        let key = wishes_key(member_id);
        Collection::new(&self.storage, &key)
            .load(normalize_wish)
            .await
    }

    pub async fn create(&self, member_id: &str, input: NewWish) -> Result<BirthdayWish, StoreError> {
        let key = wishes_key(member_id);
        let collection = Collection::new(&self.storage, &key);

        let wish = input.into_wish();
        let mut wishes = collection.load(normalize_wish).await;
        wishes.insert(0, wish.clone());
        collection.save(&wishes).await?;

        tracing::debug!(member_id, id = %wish.id, "Stored birthday wish");
        self.notifier.notify(&key);
        Ok(wish)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeSignal) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    pub fn storage_events(&self) -> StorageEvents {
        self.storage.storage_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::{Arc, Mutex};

    fn wish(author: &str, text: &str) -> NewWish {
        NewWish::new(author, text).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let wishes = WishStore::new(MemoryStore::new());
        assert!(wishes.list("grandma").await.is_empty());

        let first = wishes.create("grandma", wish("Jane", "Happy birthday!")).await.unwrap();
        let second = wishes.create("grandma", wish("", "We love you")).await.unwrap();
        assert_eq!(second.author, "Anonymous");

        let listed = wishes.list("grandma").await;
        assert_eq!(listed, vec![second, first]);
    }

    #[tokio::test]
    async fn test_members_are_isolated() {
        let wishes = WishStore::new(MemoryStore::new());
        wishes.create("grandma", wish("Jane", "Happy birthday!")).await.unwrap();

        assert!(wishes.list("grandpa").await.is_empty());
        assert_eq!(wishes.list("grandma").await.len(), 1);
    }

    #[tokio::test]
    async fn test_notifies_with_member_key() {
        let wishes = WishStore::new(MemoryStore::new());
        let keys = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&keys);
        let _sub = wishes.subscribe(move |signal| seen.lock().unwrap().push(signal.key.clone()));

        wishes.create("uncle-joe", wish("Sam", "Cheers to you")).await.unwrap();

        let keys = keys.lock().unwrap();
        assert_eq!(keys.as_slice(), ["familyverse_birthday_wishes_v1_uncle-joe"]);
        assert_eq!(member_for_key(&keys[0]), Some("uncle-joe"));
    }

    #[tokio::test]
    async fn test_other_context_sees_wish() {
        let storage = MemoryStore::new();
        let here = WishStore::new(storage.clone());
        let there = WishStore::new(storage.new_context());
        let mut events = there.storage_events();

        here.create("grandma", wish("Jane", "Happy birthday!")).await.unwrap();

        let event = events.try_recv().unwrap();
        assert_eq!(member_for_key(&event.key), Some("grandma"));
        assert_eq!(there.list("grandma").await.len(), 1);
    }

    #[test]
    fn test_member_for_key_rejects_other_keys() {
        assert_eq!(member_for_key(crate::WALL_STORAGE_KEY), None);
        assert_eq!(member_for_key(&wishes_key("x")), Some("x"));
    }
}
