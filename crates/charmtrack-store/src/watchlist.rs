//! Watchlist service over an injectable key-value store.
//!
//! The watched set is serialized as a JSON id list under a single key, so
//! any string key-value backend (browser storage bridge, redis, a file)
//! can hold it; the in-memory backend here is the default for the server.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use uuid::Uuid;

use crate::error::StoreError;

/// Minimal string key-value backend the watchlist persists through.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backend cannot be written.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .expect("kv store lock poisoned")
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .expect("kv store lock poisoned")
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .expect("kv store lock poisoned")
            .remove(key);
        Ok(())
    }
}

const WATCHLIST_KEY: &str = "charmtrack_watchlist";

/// Charm watchlist backed by an injected [`KeyValueStore`].
pub struct Watchlist {
    store: Box<dyn KeyValueStore>,
    /// Serializes read-modify-write sequences on the stored id list. The
    /// backend only locks individual get/put calls, so two concurrent
    /// mutations could otherwise both read the same snapshot and one
    /// write would overwrite the other.
    write_lock: Mutex<()>,
}

impl Watchlist {
    #[must_use]
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Adds a charm id. Returns `false` when it was already watched.
    ///
    /// # Errors
    ///
    /// Propagates backend and serialization failures.
    pub fn add(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().expect("watchlist lock poisoned");
        let mut ids = self.ids()?;
        if ids.contains(&id) {
            return Ok(false);
        }
        ids.push(id);
        self.save(&ids)?;
        Ok(true)
    }

    /// Removes a charm id. Returns `false` when it was not watched.
    ///
    /// # Errors
    ///
    /// Propagates backend and serialization failures.
    pub fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().expect("watchlist lock poisoned");
        let mut ids = self.ids()?;
        let before = ids.len();
        ids.retain(|watched| *watched != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.save(&ids)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Propagates backend and serialization failures.
    pub fn contains(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.ids()?.contains(&id))
    }

    /// Watched ids in insertion order.
    ///
    /// # Errors
    ///
    /// Propagates backend and serialization failures.
    pub fn ids(&self) -> Result<Vec<Uuid>, StoreError> {
        match self.store.get(WATCHLIST_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(ids)?;
        self.store.put(WATCHLIST_KEY, &raw)
    }
}
