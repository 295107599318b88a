//! Browser LocalStorage store (wasm only)

use std::collections::BTreeMap;

use web_sys::Storage;

use super::{KeyValueStore, StoreError};

/// Prefix for every LocalStorage item this crate writes
const KEY_PREFIX: &str = "polymerge_";

pub struct LocalStore {
    storage: Option<Storage>,
    cache: BTreeMap<String, i64>,
    pending: BTreeMap<String, i64>,
}

impl LocalStore {
    /// Attach to the window's LocalStorage. Without one (private mode,
    /// disabled storage) values are kept in memory and `flush` reports
    /// `Unavailable`.
    pub fn open() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            log::warn!("LocalStorage unavailable, best score will not persist");
        }
        Self {
            storage,
            cache: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    fn item_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    fn read(&self, key: &str) -> Option<i64> {
        let storage = self.storage.as_ref()?;
        let raw = storage.get_item(&Self::item_key(key)).ok().flatten()?;
        raw.parse().ok()
    }
}

impl KeyValueStore for LocalStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.pending
            .get(key)
            .or_else(|| self.cache.get(key))
            .copied()
            .or_else(|| self.read(key))
            .unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.pending.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let Some(storage) = self.storage.as_ref() else {
            return Err(StoreError::Unavailable("no LocalStorage".to_string()));
        };
        for (key, value) in std::mem::take(&mut self.pending) {
            let item = Self::item_key(&key);
            self.cache.insert(key, value);
            storage
                .set_item(&item, &value.to_string())
                .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?;
        }
        log::info!("Saved scores to LocalStorage");
        Ok(())
    }
}
