//! Favorited queue names, persisted across sessions

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::storage::KeyValueStore;

/// Storage key holding the JSON array of favorite names
pub const FAVORITES_KEY: &str = "queuedash.favorites";

/// Set of favorite queue names.
///
/// Names are matched exactly and kept even when no queue by that name currently exists.
/// Storage failures are logged and swallowed; the in-memory set stays authoritative for
/// the session.
pub struct FavoritesStore<S> {
    store: S,
    names: BTreeSet<String>,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Read the persisted set. Missing or corrupt data yields an empty set.
    pub fn load(store: S) -> Self {
        let names = match read_names(&store) {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Could not read favorites, starting with none");
                BTreeSet::new()
            }
        };
        debug!(count = names.len(), "Loaded favorites");
        Self { store, names }
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Flip membership and persist the whole set. Returns the new membership.
    pub fn toggle(&mut self, name: &str) -> bool {
        let now_favorite = if self.names.remove(name) {
            false
        } else {
            self.names.insert(name.to_string());
            true
        };
        self.persist();
        now_favorite
    }

    /// Drop a name, typically a favorite whose queue no longer exists
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.names.remove(name);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn persist(&self) {
        if let Err(e) = write_names(&self.store, &self.names) {
            warn!(error = %e, "Could not save favorites");
        }
    }
}

fn read_names<S: KeyValueStore>(store: &S) -> Result<BTreeSet<String>, PersistenceError> {
    let Some(raw) = store.get(FAVORITES_KEY)? else {
        return Ok(BTreeSet::new());
    };
    let names: Vec<String> =
        serde_json::from_str(&raw).map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
    Ok(names.into_iter().collect())
}

fn write_names<S: KeyValueStore>(
    store: &S,
    names: &BTreeSet<String>,
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(names).map_err(|e| PersistenceError::Storage(e.to_string()))?;
    store.set(FAVORITES_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SqliteStore};
    use std::sync::Arc;

    /// Store whose reads always fail
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Err(PersistenceError::Storage("disk on fire".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Storage("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_missing_key_loads_empty() {
        let favorites = FavoritesStore::load(MemoryStore::new());
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_corrupt_value_loads_empty() {
        let store = MemoryStore::new();
        store.set(FAVORITES_KEY, "{not json").unwrap();
        let favorites = FavoritesStore::load(store);
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_wrong_shape_loads_empty() {
        let store = MemoryStore::new();
        store.set(FAVORITES_KEY, r#"{"orders":true}"#).unwrap();
        assert!(FavoritesStore::load(store).is_empty());
    }

    #[test]
    fn test_broken_store_still_toggles_in_memory() {
        let mut favorites = FavoritesStore::load(BrokenStore);
        assert!(favorites.toggle("orders"));
        assert!(favorites.is_favorite("orders"));
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let mut favorites = FavoritesStore::load(MemoryStore::new());
        assert!(favorites.toggle("orders"));
        assert!(!favorites.toggle("orders"));
        assert!(!favorites.is_favorite("orders"));
    }

    #[test]
    fn test_toggle_persists_immediately() {
        let store = Arc::new(MemoryStore::new());
        let mut favorites = FavoritesStore::load(store.clone());
        favorites.toggle("orders");
        favorites.toggle("audit.fifo");

        let raw = store.get(FAVORITES_KEY).unwrap().unwrap();
        let saved: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved, vec!["audit.fifo", "orders"]);
    }

    #[test]
    fn test_reload_reproduces_membership() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.db");

        {
            let mut favorites = FavoritesStore::load(SqliteStore::open(&path).unwrap());
            favorites.toggle("orders");
            favorites.toggle("gone-queue");
        }

        let favorites = FavoritesStore::load(SqliteStore::open(&path).unwrap());
        assert!(favorites.is_favorite("orders"));
        assert!(favorites.is_favorite("gone-queue"));
        assert!(!favorites.is_favorite("Orders"));
        assert_eq!(favorites.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut favorites = FavoritesStore::load(MemoryStore::new());
        favorites.toggle("orders");
        assert!(favorites.remove("orders"));
        assert!(!favorites.remove("orders"));
    }
}
