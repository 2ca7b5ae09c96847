//! Registries: persisted key lists that make entity classes enumerable over a
//! store with point lookups only.
//!
//! A registry is stored as a JSON array of member keys under a well-known
//! key. Inserts are deduplicated and keep insertion order; membership is
//! checked against a hash set built when the registry is loaded.

use std::{collections::HashSet, fmt};

use tracing::debug;

use crate::{
    codec,
    error::{LedgerError, LedgerResult},
    store::{KvStore, Staged},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Persons,
    Companies,
    Papers,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 3] = [
        RegistryKind::Persons,
        RegistryKind::Companies,
        RegistryKind::Papers,
    ];

    pub fn key(self) -> &'static str {
        match self {
            RegistryKind::Persons => "PersKeys",
            RegistryKind::Companies => "CompKeys",
            RegistryKind::Papers => "PaperKeys",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    keys: Vec<String>,
    members: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a persisted list, dropping repeated members.
    pub fn from_keys(keys: Vec<String>) -> Self {
        let mut registry = Self::new();
        for key in keys {
            registry.insert(key);
        }
        registry
    }

    /// Returns `false` when `key` was already a member.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.members.contains(&key) {
            return false;
        }
        self.members.insert(key.clone());
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn read<S: KvStore + ?Sized>(
    view: &Staged<'_, S>,
    kind: RegistryKind,
) -> LedgerResult<Option<Registry>> {
    let Some(bytes) = view.get(kind.key())? else {
        return Ok(None);
    };
    // an initialized-but-empty registry may be persisted as `null`
    let keys: Option<Vec<String>> =
        codec::decode(&bytes).map_err(|e| LedgerError::IndexCorrupt {
            registry: kind.key().to_string(),
            reason: e.to_string(),
        })?;
    Ok(Some(Registry::from_keys(keys.unwrap_or_default())))
}

fn write<S: KvStore + ?Sized>(
    view: &mut Staged<'_, S>,
    kind: RegistryKind,
    registry: &Registry,
) -> LedgerResult<()> {
    codec::stage(view, kind.key(), &registry.keys)
}

/// Writes an empty registry when none exists. Returns whether it wrote.
pub fn initialize<S: KvStore + ?Sized>(
    view: &mut Staged<'_, S>,
    kind: RegistryKind,
) -> LedgerResult<bool> {
    if view.get(kind.key())?.is_some() {
        debug!(registry = %kind, "registry present, not overwriting");
        return Ok(false);
    }
    write(view, kind, &Registry::new())?;
    Ok(true)
}

/// Adds `member_key` unless already present. An absent registry counts as
/// empty. Returns whether the registry changed.
pub fn ensure_registered<S: KvStore + ?Sized>(
    view: &mut Staged<'_, S>,
    kind: RegistryKind,
    member_key: &str,
) -> LedgerResult<bool> {
    let mut registry = read(view, kind)?.unwrap_or_default();
    if !registry.insert(member_key) {
        return Ok(false);
    }
    write(view, kind, &registry)?;
    debug!(registry = %kind, member = %member_key, size = registry.len(), "registered key");
    Ok(true)
}

/// The persisted registry; `NotFound` when it was never initialized.
pub fn list_all<S: KvStore + ?Sized>(
    view: &Staged<'_, S>,
    kind: RegistryKind,
) -> LedgerResult<Registry> {
    read(view, kind)?.ok_or_else(|| LedgerError::not_found("registry", kind.key()))
}

/// Like [`list_all`], but an uninitialized registry reads as empty.
pub fn list_or_empty<S: KvStore + ?Sized>(
    view: &Staged<'_, S>,
    kind: RegistryKind,
) -> LedgerResult<Registry> {
    Ok(read(view, kind)?.unwrap_or_default())
}
