//! Person and company registration.
//!
//! Ids are derived from the name fields (lowercased, spaces removed), so two
//! different people with the same name share one id. The second registration
//! of such a name is rejected with `AlreadyExists`; records are never merged.

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::{
    codec::{self, Lookup},
    error::{LedgerError, LedgerResult},
    index::{self, RegistryKind},
    keys,
    ledger::Ledger,
    model::{Company, Person},
    store::KvStore,
};

/// A registrable identity record.
pub trait Identity: Serialize + DeserializeOwned + Clone {
    const KIND: &'static str;
    const REGISTRY: RegistryKind;

    fn key_for(id: &str) -> String;

    /// Id derived from the record's name fields.
    fn derive_id(&self) -> String;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Whether the verification fields of `self` equal those of `stored`.
    /// Name fields are part of the key and never compared.
    fn matches(&self, stored: &Self) -> bool;

    /// Copies the mutable contact fields of `update` into `self`.
    fn apply_contact(&mut self, update: &Self);
}

impl Identity for Person {
    const KIND: &'static str = "person";
    const REGISTRY: RegistryKind = RegistryKind::Persons;

    fn key_for(id: &str) -> String {
        keys::person(id)
    }

    fn derive_id(&self) -> String {
        keys::normalize_id(&format!("{}{}", self.first_name, self.last_name))
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, stored: &Self) -> bool {
        self.email == stored.email
            && self.birth_date == stored.birth_date
            && self.driving_licence == stored.driving_licence
    }

    fn apply_contact(&mut self, update: &Self) {
        self.address = update.address.clone();
        self.city = update.city.clone();
        self.postcode = update.postcode.clone();
        self.state = update.state.clone();
        self.url_links = update.url_links.clone();
    }
}

impl Identity for Company {
    const KIND: &'static str = "company";
    const REGISTRY: RegistryKind = RegistryKind::Companies;

    fn key_for(id: &str) -> String {
        keys::company(id)
    }

    fn derive_id(&self) -> String {
        keys::normalize_id(&self.name)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn matches(&self, stored: &Self) -> bool {
        self.reg_date == stored.reg_date
            && self.reg_state == stored.reg_state
            && self.acn == stored.acn
            && self.abn == stored.abn
    }

    fn apply_contact(&mut self, update: &Self) {
        self.address = update.address.clone();
        self.city = update.city.clone();
        self.postcode = update.postcode.clone();
        self.state = update.state.clone();
        self.url_links = update.url_links.clone();
    }
}

/// Decodes `raw` and replaces whatever id it carried with the derived one.
fn decode_with_id<T: Identity>(raw: &str) -> LedgerResult<T> {
    let mut record: T = codec::decode_request(T::KIND, raw)?;
    let id = record.derive_id();
    if id.is_empty() {
        return Err(LedgerError::invalid(format!("{} id cannot be blank", T::KIND)));
    }
    record.set_id(id);
    Ok(record)
}

impl<S: KvStore> Ledger<S> {
    /// Registers a new identity. Registration is create-once.
    pub fn register<T: Identity>(&self, raw: &str) -> LedgerResult<T> {
        let record: T = decode_with_id(raw)?;
        let key = T::key_for(record.id());

        let mut staged = self.stage();
        if staged.get(&key)?.is_some_and(|bytes| !bytes.is_empty()) {
            return Err(LedgerError::AlreadyExists {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }
        codec::stage(&mut staged, &key, &record)?;
        index::ensure_registered(&mut staged, T::REGISTRY, &key)?;
        staged.commit()?;

        info!(kind = T::KIND, id = %record.id(), "identity registered");
        Ok(record)
    }

    /// Checks `raw` against the stored record and returns the stored record.
    pub fn verify<T: Identity>(&self, raw: &str) -> LedgerResult<T> {
        let claimed: T = decode_with_id(raw)?;
        let stored: T = self.identity(claimed.id())?;
        if !claimed.matches(&stored) {
            return Err(LedgerError::VerificationFailed {
                kind: T::KIND,
                id: claimed.id().to_string(),
            });
        }
        Ok(stored)
    }

    /// Updates the contact fields of an existing identity. Identity and
    /// verification fields keep their registered values.
    pub fn update_identity<T: Identity>(&self, raw: &str) -> LedgerResult<T> {
        let update: T = decode_with_id(raw)?;
        let key = T::key_for(update.id());

        let mut staged = self.stage();
        let mut stored: T = match codec::lookup(&staged, &key)? {
            Lookup::Found(record) => record,
            Lookup::Absent | Lookup::Unreadable(_) => {
                return Err(LedgerError::not_found(T::KIND, update.id()))
            }
        };
        stored.apply_contact(&update);
        codec::stage(&mut staged, &key, &stored)?;
        staged.commit()?;

        info!(kind = T::KIND, id = %stored.id(), "identity contact details updated");
        Ok(stored)
    }

    pub fn identity<T: Identity>(&self, id: &str) -> LedgerResult<T> {
        let staged = self.stage();
        match codec::lookup(&staged, &T::key_for(id))? {
            Lookup::Found(record) => Ok(record),
            Lookup::Absent | Lookup::Unreadable(_) => Err(LedgerError::not_found(T::KIND, id)),
        }
    }

    /// Every registered identity of one kind, in registration order. Fails
    /// as a whole if any registered record is missing.
    pub fn identities<T: Identity>(&self) -> LedgerResult<Vec<T>> {
        let staged = self.stage();
        let registry = index::list_all(&staged, T::REGISTRY)?;
        registry
            .keys()
            .iter()
            .map(|key| codec::load(&staged, T::KIND, key))
            .collect()
    }
}
