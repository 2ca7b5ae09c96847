//! Byte encoding of ledger records.
//!
//! Records are stored as JSON. Reads distinguish "absent" from "present but
//! undecodable" so callers can pick the right error for their contract.

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::{
    error::{LedgerError, LedgerResult},
    store::{KvStore, Staged},
};

pub fn encode<T: Serialize>(record: &T) -> LedgerResult<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Decodes a caller-supplied JSON argument.
pub fn decode_request<T: DeserializeOwned>(kind: &str, raw: &str) -> LedgerResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| LedgerError::invalid(format!("invalid {kind} record: {e}")))
}

/// Result of looking a record up by key.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    Absent,
    /// Bytes exist (possibly empty) but do not decode.
    Unreadable(String),
}

pub fn lookup<T, S>(view: &Staged<'_, S>, key: &str) -> LedgerResult<Lookup<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    let Some(bytes) = view.get(key)? else {
        return Ok(Lookup::Absent);
    };
    Ok(match decode(&bytes) {
        Ok(record) => Lookup::Found(record),
        Err(err) => Lookup::Unreadable(err.to_string()),
    })
}

/// Reads a record that must exist; missing and undecodable both map to
/// `NotFound`.
pub fn load<T, S>(view: &Staged<'_, S>, kind: &'static str, key: &str) -> LedgerResult<T>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    match lookup(view, key)? {
        Lookup::Found(record) => Ok(record),
        Lookup::Absent => Err(LedgerError::not_found(kind, key)),
        Lookup::Unreadable(reason) => {
            warn!(key = %key, %reason, "stored {kind} does not decode");
            Err(LedgerError::not_found(kind, key))
        }
    }
}

pub fn stage<T, S>(view: &mut Staged<'_, S>, key: &str, record: &T) -> LedgerResult<()>
where
    T: Serialize,
    S: KvStore + ?Sized,
{
    view.put(key, encode(record)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Account, store::MemoryStore};

    #[test]
    fn load_maps_garbage_to_not_found() {
        let store = MemoryStore::new();
        store.put("acct:x", b"{not json".to_vec()).unwrap();
        let view = Staged::new(&store);
        match load::<Account, _>(&view, "account", "acct:x") {
            Err(LedgerError::NotFound { kind, key }) => {
                assert_eq!(kind, "account");
                assert_eq!(key, "acct:x");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            lookup::<Account, _>(&view, "acct:x").unwrap(),
            Lookup::Unreadable(_)
        ));
        assert!(matches!(
            lookup::<Account, _>(&view, "acct:y").unwrap(),
            Lookup::Absent
        ));
    }

    #[test]
    fn staged_record_reads_back() {
        let store = MemoryStore::new();
        let mut view = Staged::new(&store);
        let account = Account {
            id: "company1".into(),
            prefix: "10000A".into(),
            ..Account::default()
        };
        stage(&mut view, "acct:company1", &account).unwrap();
        let back: Account = load(&view, "account", "acct:company1").unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn bad_request_is_a_validation_error() {
        let err = decode_request::<Account>("account", "[1,2").unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
