//! Cash accounts and the holdings view derived from paper owner lists.

use tracing::{info, warn};

use crate::{
    codec::{self, Lookup},
    error::{LedgerError, LedgerResult},
    index::{self, RegistryKind},
    keys,
    ledger::Ledger,
    model::{Account, CommercialPaper, Cusip},
    store::{KvStore, Staged},
};

/// Upper bound on `create_accounts`; one call stages every account in a
/// single batch.
pub const MAX_BULK_ACCOUNTS: u32 = 10_000;

/// CUSIP prefix of the `counter`-th bulk account.
///
/// Counters below ten get an extra `0`, so `company1` and `company10` share a
/// prefix; papers they issue with equal maturity dates collide.
pub fn bulk_prefix(counter: u32, suffix: &str) -> String {
    if counter < 10 {
        format!("{counter}0{suffix}")
    } else {
        format!("{counter}{suffix}")
    }
}

/// CUSIPs of every registered paper in which `owner` holds a positive
/// quantity, in registry order.
pub(crate) fn derive_asset_ids<S: KvStore + ?Sized>(
    view: &Staged<'_, S>,
    owner: &str,
) -> LedgerResult<Vec<Cusip>> {
    let registry = index::list_or_empty(view, RegistryKind::Papers)?;
    let mut held = Vec::new();
    for key in registry.keys() {
        let paper: CommercialPaper = codec::load(view, "paper", key)?;
        if paper.holding(owner).is_some_and(|qty| qty > 0) {
            held.push(paper.cusip);
        }
    }
    Ok(held)
}

/// Recomputes the holdings view of `account` and stages it under the key
/// of `id`, the id it was loaded by.
pub(crate) fn stage_account<S: KvStore + ?Sized>(
    view: &mut Staged<'_, S>,
    id: &str,
    account: &mut Account,
) -> LedgerResult<()> {
    account.asset_ids = derive_asset_ids(view, id)?;
    codec::stage(view, &keys::account(id), account)
}

impl<S: KvStore> Ledger<S> {
    pub fn create_account(&self, id: &str) -> LedgerResult<Account> {
        let id = id.trim();
        if id.is_empty() {
            return Err(LedgerError::invalid("account id cannot be blank"));
        }
        let key = keys::account(id);
        let mut staged = self.stage();
        match codec::lookup::<Account, _>(&staged, &key)? {
            Lookup::Found(existing) => {
                return Err(LedgerError::AlreadyExists {
                    kind: "account",
                    id: existing.id,
                })
            }
            Lookup::Unreadable(reason) => {
                warn!(key = %key, %reason, "overwriting unreadable account record");
            }
            Lookup::Absent => {}
        }

        let mut account = Account {
            id: id.to_string(),
            prefix: format!("{id}{}", self.config().account_suffix),
            cash_balance: self.config().starting_balance,
            asset_ids: Vec::new(),
        };
        stage_account(&mut staged, id, &mut account)?;
        staged.commit()?;
        info!(account = %account.id, prefix = %account.prefix, "account created");
        Ok(account)
    }

    /// Creates `company1..=company{count}` with the starting balance,
    /// replacing whatever was stored under those keys.
    /// Holdings are kept: a company that still owns paper gets its view
    /// recomputed, not cleared.
    pub fn create_accounts(&self, count: u32) -> LedgerResult<Vec<Account>> {
        if count > MAX_BULK_ACCOUNTS {
            return Err(LedgerError::invalid(format!(
                "cannot create more than {MAX_BULK_ACCOUNTS} accounts at once, got {count}"
            )));
        }
        let mut staged = self.stage();
        let mut created = Vec::with_capacity(count as usize);
        for counter in 1..=count {
            let id = format!("company{counter}");
            let mut account = Account {
                id: id.clone(),
                prefix: bulk_prefix(counter, &self.config().account_suffix),
                cash_balance: self.config().starting_balance,
                asset_ids: Vec::new(),
            };
            stage_account(&mut staged, &id, &mut account)?;
            created.push(account);
        }
        staged.commit()?;
        info!(count, "accounts created");
        Ok(created)
    }

    pub fn account(&self, id: &str) -> LedgerResult<Account> {
        codec::load(&self.stage(), "account", &keys::account(id))
    }

    /// Holdings of `id` computed from the current owner lists.
    pub fn holdings(&self, id: &str) -> LedgerResult<Vec<Cusip>> {
        derive_asset_ids(&self.stage(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::LedgerConfig, model::Owner, store::MemoryStore};
    use rust_decimal::Decimal;

    #[test]
    fn bulk_prefixes_follow_counter_rule() {
        assert_eq!(bulk_prefix(1, "000A"), "10000A");
        assert_eq!(bulk_prefix(9, "000A"), "90000A");
        assert_eq!(bulk_prefix(10, "000A"), "10000A");
        assert_eq!(bulk_prefix(42, "000A"), "42000A");
    }

    #[test]
    fn create_accounts_builds_numbered_companies() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        let created = ledger.create_accounts(3).unwrap();
        assert_eq!(created.len(), 3);
        for (idx, expected_prefix) in ["10000A", "20000A", "30000A"].iter().enumerate() {
            let account = ledger.account(&format!("company{}", idx + 1)).unwrap();
            assert_eq!(account.prefix, *expected_prefix);
            assert_eq!(account.cash_balance, Decimal::new(10_000_000, 0));
            assert!(account.asset_ids.is_empty());
        }
        assert!(ledger.account("company4").is_err());
    }

    #[test]
    fn create_accounts_overwrites_existing() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        ledger.create_accounts(1).unwrap();
        let mut drained = ledger.account("company1").unwrap();
        drained.cash_balance = Decimal::ZERO;
        ledger
            .store()
            .put("acct:company1", serde_json::to_vec(&drained).unwrap())
            .unwrap();
        ledger.create_accounts(1).unwrap();
        assert_eq!(
            ledger.account("company1").unwrap().cash_balance,
            Decimal::new(10_000_000, 0)
        );
    }

    #[test]
    fn create_account_is_create_once() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        let account = ledger.create_account("alice").unwrap();
        assert_eq!(account.prefix, "alice000A");
        match ledger.create_account("alice").unwrap_err() {
            LedgerError::AlreadyExists { kind, id } => {
                assert_eq!(kind, "account");
                assert_eq!(id, "alice");
            }
            _ => panic!("unexpected error"),
        }
    }

    #[test]
    fn create_account_overwrites_corrupt_record() {
        // data-integrity hazard: an unreadable record is silently replaced
        let ledger = Ledger::with_defaults(MemoryStore::new());
        ledger.store().put("acct:bob", Vec::new()).unwrap();
        ledger.create_account("bob").unwrap();
        ledger
            .store()
            .put("acct:carol", b"{\"cashBalance\":".to_vec())
            .unwrap();
        ledger.create_account("carol").unwrap();
        assert_eq!(ledger.account("carol").unwrap().prefix, "carol000A");
    }

    #[test]
    fn configured_suffix_and_balance_apply() {
        let config = LedgerConfig {
            account_suffix: "777B".into(),
            starting_balance: Decimal::new(5_000, 0),
            ..LedgerConfig::default()
        };
        let ledger = Ledger::new(MemoryStore::new(), config);
        let account = ledger.create_account("dave").unwrap();
        assert_eq!(account.prefix, "dave777B");
        assert_eq!(account.cash_balance, Decimal::new(5_000, 0));
    }

    #[test]
    fn recreating_accounts_keeps_holdings_view() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        ledger.init().unwrap();
        ledger.create_accounts(1).unwrap();
        ledger.store().put("acct:bob", b"garbage".to_vec()).unwrap();
        let paper = CommercialPaper {
            cusip: "10000AAX".into(),
            qty: 5,
            owners: vec![
                Owner { company: "company1".into(), quantity: 3 },
                Owner { company: "bob".into(), quantity: 2 },
            ],
            ..CommercialPaper::default()
        };
        ledger
            .store()
            .put("cp:10000AAX", serde_json::to_vec(&paper).unwrap())
            .unwrap();
        ledger
            .store()
            .put("PaperKeys", br#"["cp:10000AAX"]"#.to_vec())
            .unwrap();

        let created = ledger.create_accounts(1).unwrap();
        assert_eq!(created[0].asset_ids, vec!["10000AAX"]);
        assert_eq!(ledger.account("company1").unwrap().asset_ids, vec!["10000AAX"]);

        ledger.create_account("bob").unwrap();
        assert_eq!(ledger.account("bob").unwrap().asset_ids, vec!["10000AAX"]);
    }

    #[test]
    fn bulk_creation_is_capped() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        assert!(matches!(
            ledger.create_accounts(MAX_BULK_ACCOUNTS + 1),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.create_accounts(u32::MAX),
            Err(LedgerError::Validation(_))
        ));
        assert!(ledger.store().is_empty());
    }

    #[test]
    fn blank_account_id_is_invalid() {
        let ledger = Ledger::with_defaults(MemoryStore::new());
        assert!(matches!(
            ledger.create_account("  "),
            Err(LedgerError::Validation(_))
        ));
    }
}
