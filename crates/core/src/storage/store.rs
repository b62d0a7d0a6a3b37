use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::CoreError;

/// Durable key-value persistence of encoded ledger records.
///
/// Backends only move bytes; encoding, sealing and seeding live in
/// [`StorageManager`](super::manager::StorageManager). A backend is owned by a
/// single session at a time, so implementations need no cross-process
/// coordination.
pub trait LedgerStore: Send + Sync {
    /// Human-readable backend name (for logs/errors).
    fn name(&self) -> &str;

    /// Read the record stored under `key`, `None` if there isn't one.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Replace the record under `key` in one step: readers see either the old
    /// or the new record, never a mix.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError>;

    /// Delete the record under `key`. Returns whether one existed.
    fn remove(&self, key: &str) -> Result<bool, CoreError>;

    /// All keys with a stored record.
    fn keys(&self) -> Result<Vec<String>, CoreError>;
}

/// Volatile store for tests and embedders that handle persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CoreError {
        CoreError::FileIO("memory store lock poisoned".into())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        Ok(records.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, CoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        let mut keys: Vec<String> = records.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
