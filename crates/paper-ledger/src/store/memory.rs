//! In-memory store.
//!
//! Batches are applied under a single write lock, so readers never see a
//! partially committed invocation. Data is lost when the store is dropped.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use super::{state_digest, KvStore, StoreError, WriteBatch};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn state_digest(&self) -> [u8; 32] {
        state_digest(&self.entries.read())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        debug!(writes = batch.len(), "applying batch");
        for (key, value) in batch {
            entries.insert(key, value);
        }
        Ok(())
    }
}
