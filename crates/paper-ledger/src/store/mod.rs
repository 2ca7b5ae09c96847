//! Key-value boundary of the ledger.
//!
//! The engine only ever needs point reads and writes. [`KvStore::apply`]
//! is the single commit hook: the bundled stores apply a whole batch under
//! one lock, while a get/put-only backend falls back to sequential puts with
//! compensating rollback.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted store content could not be decoded.
    #[error("store content is corrupt: {0}")]
    Corrupt(String),

    /// Failure reported by an external backend.
    #[error("store backend error: {0}")]
    Backend(String),
}

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Commit every write of `batch` or, as far as the backend allows, none.
    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        apply_sequential(self, batch)
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, value)
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).apply(batch)
    }
}

/// Ordered set of pending writes. Writing a key twice keeps its first
/// position and the last value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<(String, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        match self.writes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.writes.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.writes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = (String, Vec<u8>);
    type IntoIter = std::vec::IntoIter<(String, Vec<u8>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// Read-your-writes view over a store for the duration of one invocation.
pub struct Staged<'a, S: KvStore + ?Sized> {
    store: &'a S,
    batch: WriteBatch,
}

impl<'a, S: KvStore + ?Sized> Staged<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            batch: WriteBatch::new(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(value) = self.batch.get(key) {
            return Ok(Some(value.to_vec()));
        }
        self.store.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        debug!(key = %key, bytes = value.len(), "staging write");
        self.batch.put(key, value);
    }

    pub fn pending(&self) -> &WriteBatch {
        &self.batch
    }

    /// Hands the staged writes to the store; returns how many keys were written.
    pub fn commit(self) -> Result<usize, StoreError> {
        let written = self.batch.len();
        if written > 0 {
            self.store.apply(self.batch)?;
        }
        Ok(written)
    }
}

fn apply_sequential<S: KvStore + ?Sized>(store: &S, batch: WriteBatch) -> Result<(), StoreError> {
    let mut undo: Vec<(String, Option<Vec<u8>>)> = Vec::with_capacity(batch.len());
    for (key, value) in batch {
        let step = store
            .get(&key)
            .and_then(|prior| store.put(&key, value).map(|()| prior));
        match step {
            Ok(prior) => undo.push((key, prior)),
            Err(err) => {
                error!(
                    key = %key,
                    error = %err,
                    applied = undo.len(),
                    "batch write failed, rolling back"
                );
                roll_back(store, undo);
                return Err(err);
            }
        }
    }
    Ok(())
}

fn roll_back<S: KvStore + ?Sized>(store: &S, undo: Vec<(String, Option<Vec<u8>>)>) {
    for (key, prior) in undo.into_iter().rev() {
        match prior {
            Some(bytes) => {
                if let Err(err) = store.put(&key, bytes) {
                    error!(key = %key, error = %err, "rollback write failed");
                }
            }
            // get/put offers no delete
            None => warn!(key = %key, "key created by failed batch cannot be removed"),
        }
    }
}

/// SHA-256 binary merkle root over `(key, value)` leaves in key order.
pub fn state_digest(entries: &BTreeMap<String, Vec<u8>>) -> [u8; 32] {
    let leaves = entries
        .iter()
        .map(|(key, value)| {
            let mut hasher = Sha256::new();
            hasher.update(b"kv");
            hasher.update((key.len() as u64).to_le_bytes());
            hasher.update(key.as_bytes());
            hasher.update(value);
            hasher.finalize().into()
        })
        .collect();
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"paper-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
