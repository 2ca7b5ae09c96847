use tracing::info;

use crate::{
    config::LedgerConfig,
    error::LedgerResult,
    index::{self, RegistryKind},
    store::{KvStore, Staged},
};

/// The ledger engine: a store plus the configuration it was started with.
///
/// Operations are spread over the component modules ([`crate::identity`],
/// [`crate::accounts`], [`crate::paper`], [`crate::dispatch`]). Each one
/// stages its writes and commits them as a single batch.
pub struct Ledger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: KvStore> Ledger<S> {
    /// `config` should already have passed [`LedgerConfig::validate`]; a zero
    /// day-count basis would make settlement divide by zero.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: S) -> Self {
        Self::new(store, LedgerConfig::default())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn stage(&self) -> Staged<'_, S> {
        Staged::new(&self.store)
    }

    /// Creates every registry that does not exist yet; existing registries
    /// are left untouched. Returns the registries that were created.
    pub fn init(&self) -> LedgerResult<Vec<RegistryKind>> {
        let mut staged = self.stage();
        let mut created = Vec::new();
        for kind in RegistryKind::ALL {
            if index::initialize(&mut staged, kind)? {
                created.push(kind);
            }
        }
        staged.commit()?;
        info!(created = ?created, "registries initialized");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn init_is_idempotent() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        assert_eq!(ledger.init().unwrap(), RegistryKind::ALL.to_vec());
        let digest = ledger.store().state_digest();
        assert!(ledger.init().unwrap().is_empty());
        assert_eq!(ledger.store().state_digest(), digest);
    }

    #[test]
    fn init_keeps_existing_registry() {
        let store = MemoryStore::new();
        store
            .put("PersKeys", br#"["pers:johnsmith"]"#.to_vec())
            .unwrap();
        let ledger = Ledger::with_defaults(store);
        let created = ledger.init().unwrap();
        assert_eq!(created, vec![RegistryKind::Companies, RegistryKind::Papers]);
        assert_eq!(
            ledger.store().get("PersKeys").unwrap(),
            Some(br#"["pers:johnsmith"]"#.to_vec())
        );
    }
}
