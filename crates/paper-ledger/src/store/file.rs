//! JSON file store.
//!
//! The whole key space is kept in memory and mirrored to a single JSON object
//! (`key -> base64 value`). Every commit rewrites the file through a
//! temporary sibling and a rename, so the file always holds either the state
//! before or after a batch.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose, Engine as _};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{state_digest, KvStore, StoreError, WriteBatch};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl FileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read(&path)?;
            decode_entries(&raw)?
        } else {
            BTreeMap::new()
        };
        info!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries.read().clone()
    }

    pub fn state_digest(&self) -> [u8; 32] {
        state_digest(&self.entries.read())
    }

    fn persist(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), StoreError> {
        let encoded: BTreeMap<&str, String> = entries
            .iter()
            .map(|(k, v)| (k.as_str(), general_purpose::STANDARD.encode(v)))
            .collect();
        let bytes = serde_json::to_vec_pretty(&encoded)
            .map_err(|e| StoreError::Corrupt(format!("encode: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = temp_sibling(&self.path);
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "store persisted");
        Ok(())
    }
}

/// `ledger.json` -> `ledger.json.tmp`; never the store path itself.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn decode_entries(raw: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    let encoded: BTreeMap<String, String> =
        serde_json::from_slice(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    encoded
        .into_iter()
        .map(|(key, value)| {
            general_purpose::STANDARD
                .decode(value.as_bytes())
                .map(|bytes| (key.clone(), bytes))
                .map_err(|e| StoreError::Corrupt(format!("value of {key}: {e}")))
        })
        .collect()
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.apply(batch)
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        for (key, value) in batch {
            next.insert(key, value);
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}
