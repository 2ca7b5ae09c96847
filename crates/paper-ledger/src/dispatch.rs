//! Named invocations and queries.
//!
//! Invocations mutate state and return the resulting record as JSON.
//! Queries are read-only; a query name that is not one of the known
//! functions is looked up as a raw store key.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    accounts::MAX_BULK_ACCOUNTS,
    codec,
    error::{LedgerError, LedgerResult},
    index::RegistryKind,
    ledger::Ledger,
    model::{Company, Person},
    store::KvStore,
};

/// One entry of a batch script.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Call {
    pub function: String,
    pub args: Vec<String>,
    /// Route to [`Ledger::query`] instead of [`Ledger::invoke`].
    pub query: bool,
}

impl Call {
    pub fn invoke(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
            query: false,
        }
    }

    pub fn query(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
            query: true,
        }
    }
}

fn single<'a>(function: &str, args: &'a [String]) -> LedgerResult<&'a str> {
    match args {
        [arg] => Ok(arg.as_str()),
        _ => Err(LedgerError::invalid(format!(
            "{function} expects 1 argument, got {}",
            args.len()
        ))),
    }
}

fn none(function: &str, args: &[String]) -> LedgerResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::invalid(format!(
            "{function} expects no arguments, got {}",
            args.len()
        )))
    }
}

impl<S: KvStore> Ledger<S> {
    pub fn invoke(&self, function: &str, args: &[String]) -> LedgerResult<Vec<u8>> {
        debug!(function, argc = args.len(), "invoke");
        match function {
            "init" => {
                // the hosting platform passes arbitrary init arguments
                let created: Vec<&str> =
                    self.init()?.into_iter().map(RegistryKind::key).collect();
                codec::encode(&created)
            }
            "issueCommercialPaper" => codec::encode(&self.issue_json(single(function, args)?)?),
            "transferPaper" => codec::encode(&self.transfer_json(single(function, args)?)?),
            "registerPerson" => {
                codec::encode(&self.register::<Person>(single(function, args)?)?)
            }
            "registerCompany" => {
                codec::encode(&self.register::<Company>(single(function, args)?)?)
            }
            "updatePerson" => {
                codec::encode(&self.update_identity::<Person>(single(function, args)?)?)
            }
            "updateCompany" => {
                codec::encode(&self.update_identity::<Company>(single(function, args)?)?)
            }
            "createAccount" => codec::encode(&self.create_account(single(function, args)?)?),
            "createAccounts" => {
                let raw = single(function, args)?;
                let count: u32 = raw.trim().parse().map_err(|_| {
                    LedgerError::invalid(format!(
                        "account count must be a non-negative integer, got {raw:?}"
                    ))
                })?;
                if count > MAX_BULK_ACCOUNTS {
                    return Err(LedgerError::invalid(format!(
                        "account count must be at most {MAX_BULK_ACCOUNTS}, got {count}"
                    )));
                }
                codec::encode(&self.create_accounts(count)?)
            }
            other => Err(LedgerError::UnknownFunction(other.to_string())),
        }
    }

    pub fn query(&self, function: &str, args: &[String]) -> LedgerResult<Vec<u8>> {
        debug!(function, argc = args.len(), "query");
        match function {
            "GetAllCPs" => {
                none(function, args)?;
                codec::encode(&self.papers()?)
            }
            "GetCP" => codec::encode(&self.paper(single(function, args)?)?),
            "GetAllPersons" => {
                none(function, args)?;
                codec::encode(&self.identities::<Person>()?)
            }
            "GetPerson" => codec::encode(&self.identity::<Person>(single(function, args)?)?),
            "GetAllCompanies" => {
                none(function, args)?;
                codec::encode(&self.identities::<Company>()?)
            }
            "GetCompany" => codec::encode(&self.identity::<Company>(single(function, args)?)?),
            "VerifyPerson" => codec::encode(&self.verify::<Person>(single(function, args)?)?),
            "VerifyCompany" => codec::encode(&self.verify::<Company>(single(function, args)?)?),
            "GetAccount" => codec::encode(&self.account(single(function, args)?)?),
            key => Ok(self.stage().get(key)?.unwrap_or_default()),
        }
    }

    pub fn dispatch(&self, call: &Call) -> LedgerResult<Vec<u8>> {
        if call.query {
            self.query(&call.function, &call.args)
        } else {
            self.invoke(&call.function, &call.args)
        }
    }
}
