//! Favorites store
//!
//! The user's saved entries, in the order they were added, mirrored to a
//! [`KeyValueStore`] after every change. The in-memory list is authoritative:
//! if storage misbehaves the session carries on and only durability is lost.

use crate::models::FavoriteItem;
use crate::storage::KeyValueStore;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Storage key holding the whole collection as a JSON array
pub const FAVORITES_KEY: &str = "nasa-apod-favorites";

pub struct FavoritesStore {
    items: Vec<FavoriteItem>,
    storage: Box<dyn KeyValueStore>,
    /// Last persistence problem, if the most recent read/write failed
    warning: Option<String>,
}

impl FavoritesStore {
    /// Load the persisted collection. Missing, unreadable or malformed data
    /// all give an empty store - never an error.
    pub fn initialize(storage: Box<dyn KeyValueStore>) -> Self {
        let mut warning = None;

        let items = match storage.get(FAVORITES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<FavoriteItem>>(&raw) {
                Ok(items) => dedupe_by_date(items),
                Err(e) => {
                    warn!("Ignoring unreadable favorites record: {}", e);
                    warning = Some(format!("Saved favorites could not be read: {}", e));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Could not load favorites: {}", e);
                warning = Some(format!("Saved favorites could not be loaded: {}", e));
                Vec::new()
            }
        };

        debug!("Loaded {} favorites", items.len());

        Self {
            items,
            storage,
            warning,
        }
    }

    /// Remove the entry with this item's date if there is one, otherwise
    /// append the item. Either way the full collection is written back.
    pub fn toggle(&mut self, item: FavoriteItem) {
        if let Some(pos) = self.items.iter().position(|f| f.date == item.date) {
            let removed = self.items.remove(pos);
            debug!("Removed favorite {}", removed.date);
        } else {
            debug!("Added favorite {}", item.date);
            self.items.push(item);
        }
        self.persist();
    }

    pub fn is_favorite(&self, date: &str) -> bool {
        self.items.iter().any(|f| f.date == date)
    }

    /// Snapshot of the collection, oldest addition first
    pub fn list(&self) -> Vec<FavoriteItem> {
        self.items.clone()
    }

    /// Borrowing view of the collection, same order as [`list`](Self::list)
    pub fn items(&self) -> &[FavoriteItem] {
        &self.items
    }

    pub fn get(&self, date: &str) -> Option<&FavoriteItem> {
        self.items.iter().find(|f| f.date == date)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Non-fatal notice for the UI when saving or loading last went wrong
    pub fn persistence_warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.items)
            .map_err(crate::Error::from)
            .and_then(|json| self.storage.set(FAVORITES_KEY, &json));

        match result {
            Ok(()) => self.warning = None,
            Err(e) => {
                warn!("Favorites not saved, keeping them for this session only: {}", e);
                self.warning = Some(format!("Favorites could not be saved: {}", e));
            }
        }
    }
}

/// Keep the first occurrence of every date; a hand-edited record may repeat one
fn dedupe_by_date(items: Vec<FavoriteItem>) -> Vec<FavoriteItem> {
    let mut seen = HashSet::new();
    let before = items.len();
    let unique: Vec<_> = items
        .into_iter()
        .filter(|item| seen.insert(item.date.clone()))
        .collect();
    if unique.len() != before {
        warn!("Dropped {} duplicate favorites", before - unique.len());
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use crate::storage::{FileStore, MemoryStore};
    use crate::{Error, Result};

    fn item(date: &str, title: &str) -> FavoriteItem {
        FavoriteItem {
            date: date.to_string(),
            title: title.to_string(),
            explanation: format!("About {}", title),
            media_type: MediaType::Image,
            url: format!("https://apod.nasa.gov/{}.jpg", date),
            hd_url: None,
            copyright: None,
        }
    }

    fn dates(store: &FavoritesStore) -> Vec<String> {
        store.list().into_iter().map(|f| f.date).collect()
    }

    /// Storage that refuses every operation
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::StorageError("storage unavailable".into()))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::StorageError("quota exceeded".into()))
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(Error::StorageError("storage unavailable".into()))
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut store = FavoritesStore::initialize(Box::new(MemoryStore::new()));
        let entry = item("2024-01-01", "New Year");

        store.toggle(entry.clone());
        assert_eq!(store.list(), vec![entry.clone()]);
        assert!(store.is_favorite("2024-01-01"));

        store.toggle(entry);
        assert!(store.list().is_empty());
        assert!(!store.is_favorite("2024-01-01"));
    }

    #[test]
    fn test_identity_is_date_only() {
        let mut store = FavoritesStore::initialize(Box::new(MemoryStore::new()));

        store.toggle(item("2024-01-01", "First snapshot"));
        // Different content, same date: removes instead of adding
        store.toggle(item("2024-01-01", "Edited title"));

        assert!(store.is_empty());
        assert!(!store.is_favorite("2024-01-01"));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let mut store = FavoritesStore::initialize(Box::new(MemoryStore::new()));
        store.toggle(item("2024-03-01", "c"));
        store.toggle(item("2023-01-01", "a"));
        store.toggle(item("2024-01-01", "b"));

        assert_eq!(dates(&store), vec!["2024-03-01", "2023-01-01", "2024-01-01"]);

        // Removing from the middle keeps the rest in place
        store.toggle(item("2023-01-01", "a"));
        assert_eq!(dates(&store), vec!["2024-03-01", "2024-01-01"]);
    }

    #[test]
    fn test_is_favorite_is_a_pure_query() {
        let mut store = FavoritesStore::initialize(Box::new(MemoryStore::new()));
        store.toggle(item("2024-01-01", "x"));

        let first = store.is_favorite("2024-01-01");
        let second = store.is_favorite("2024-01-01");
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reload_restores_same_collection() {
        let backing = MemoryStore::new();
        let mut store = FavoritesStore::initialize(Box::new(backing.clone()));

        let mut video = item("2024-01-02", "Video day");
        video.media_type = MediaType::Video;
        video.copyright = Some("Someone".into());
        let mut hd = item("2024-01-03", "HD day");
        hd.hd_url = Some("https://apod.nasa.gov/hd.jpg".into());

        store.toggle(item("2024-01-01", "Plain"));
        store.toggle(video);
        store.toggle(hd);
        let before = store.list();

        // Simulated restart against the same storage
        let reloaded = FavoritesStore::initialize(Box::new(backing));
        assert_eq!(reloaded.list(), before);
    }

    #[test]
    fn test_every_mutation_is_written_through() {
        let backing = MemoryStore::new();
        let mut store = FavoritesStore::initialize(Box::new(backing.clone()));

        store.toggle(item("2024-01-01", "x"));
        let raw = backing.get(FAVORITES_KEY).unwrap().unwrap();
        let saved: Vec<FavoriteItem> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.len(), 1);

        store.toggle(item("2024-01-01", "x"));
        let raw = backing.get(FAVORITES_KEY).unwrap().unwrap();
        assert_eq!(raw, "[]");
    }

    #[test]
    fn test_persisted_record_shape() {
        let backing = MemoryStore::new();
        let mut store = FavoritesStore::initialize(Box::new(backing.clone()));
        store.toggle(item("2024-01-01", "x"));

        let raw = backing.get(FAVORITES_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let obj = value[0].as_object().unwrap();
        assert_eq!(obj["mediaType"], "image");
        assert!(obj.contains_key("explanation"));
        // Absent optionals stay absent
        assert!(!obj.contains_key("hdUrl"));
        assert!(!obj.contains_key("copyright"));
    }

    #[test]
    fn test_missing_record_gives_empty_store() {
        let store = FavoritesStore::initialize(Box::new(MemoryStore::new()));
        assert!(store.is_empty());
        assert!(store.persistence_warning().is_none());
    }

    #[test]
    fn test_corrupted_record_gives_empty_store() {
        for garbage in ["{not json", "{\"date\": \"2024-01-01\"}", "[{\"title\": 1}]", ""] {
            let backing = MemoryStore::new().with_entry(FAVORITES_KEY, garbage);
            let store = FavoritesStore::initialize(Box::new(backing));
            assert!(store.is_empty(), "expected empty store for {:?}", garbage);
        }
    }

    #[test]
    fn test_unreadable_storage_gives_empty_store() {
        let store = FavoritesStore::initialize(Box::new(BrokenStore));
        assert!(store.is_empty());
        assert!(store.persistence_warning().is_some());
    }

    #[test]
    fn test_write_failures_keep_session_state() {
        let mut store = FavoritesStore::initialize(Box::new(BrokenStore));

        store.toggle(item("2024-01-01", "x"));
        store.toggle(item("2024-01-02", "y"));

        assert_eq!(dates(&store), vec!["2024-01-01", "2024-01-02"]);
        assert!(store.is_favorite("2024-01-02"));
        assert!(store
            .persistence_warning()
            .unwrap()
            .contains("quota exceeded"));
    }

    #[test]
    fn test_duplicate_dates_in_record_are_collapsed() {
        let raw = serde_json::to_string(&vec![
            item("2024-01-01", "first"),
            item("2024-01-02", "other"),
            item("2024-01-01", "second"),
        ])
        .unwrap();
        let store = FavoritesStore::initialize(Box::new(MemoryStore::new().with_entry(FAVORITES_KEY, &raw)));

        assert_eq!(dates(&store), vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(store.get("2024-01-01").unwrap().title, "first");
    }

    #[test]
    fn test_file_backed_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut store = FavoritesStore::initialize(Box::new(FileStore::new(dir.path())));
            store.toggle(item("2024-01-01", "x"));
            store.toggle(item("2024-01-05", "y"));
        }

        let store = FavoritesStore::initialize(Box::new(FileStore::new(dir.path())));
        assert_eq!(dates(&store), vec!["2024-01-01", "2024-01-05"]);
    }
}
