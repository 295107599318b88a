//! Key-value persistence
//!
//! The session only ever stores integers (the best score). Stores buffer
//! writes in memory; `flush` makes them durable.
//!
//! Backends:
//! - `MemoryStore` for tests and headless runs
//! - `JsonFileStore` on native, one JSON object per file
//! - `LocalStore` on wasm, one LocalStorage item per key

use std::collections::BTreeMap;

use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
pub mod file;
#[cfg(target_arch = "wasm32")]
pub mod local;

#[cfg(not(target_arch = "wasm32"))]
pub use file::JsonFileStore;
#[cfg(target_arch = "wasm32")]
pub use local::LocalStore;

/// Key the best score is stored under
pub const BEST_SCORE_KEY: &str = "BestScore";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Integer key-value storage
pub trait KeyValueStore {
    /// Stored value, or `default` if the key was never written
    fn get_int(&self, key: &str, default: i64) -> i64;

    fn set_int(&mut self, key: &str, value: i64);

    /// Persist every buffered write
    fn flush(&mut self) -> Result<(), StoreError>;
}

/// Volatile store that keeps values for the life of the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
    flushes: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `flush` was called
    pub fn flush_count(&self) -> u32 {
        self.flushes
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_defaults_and_overwrites() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_int(BEST_SCORE_KEY, 0), 0);
        assert_eq!(store.get_int(BEST_SCORE_KEY, 7), 7);

        store.set_int(BEST_SCORE_KEY, 120);
        store.set_int(BEST_SCORE_KEY, 150);
        assert_eq!(store.get_int(BEST_SCORE_KEY, 0), 150);

        store.flush().unwrap();
        assert_eq!(store.flush_count(), 1);
    }
}
