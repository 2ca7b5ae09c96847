//! Persisted records and invocation payloads.
//!
//! Field names follow the JSON the marketplace clients already send
//! (`camelCase`, `owner` for the owner list, `tfn`, `dataPhoto`). Missing
//! fields and `null` lists decode to their defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LedgerError, LedgerResult};

pub type AccountId = String;
pub type Cusip = String;
pub type Quantity = i64;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub prefix: String,
    pub cash_balance: Decimal,
    /// CUSIPs in which this account holds a positive quantity.
    #[serde(deserialize_with = "null_as_default")]
    pub asset_ids: Vec<Cusip>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct UrlLink {
    pub url: String,
    pub url_type: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: String,
    pub gender: String,
    pub driving_licence: String,
    #[serde(rename = "tfn")]
    pub tax_file_number: String,
    pub address: String,
    pub city: String,
    pub postcode: String,
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url_links: Vec<UrlLink>,
    #[serde(rename = "dataPhoto")]
    pub photo: String,
    pub registrator: String,
    pub register_date: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub acn: String,
    pub abn: String,
    pub reg_date: String,
    pub reg_state: String,
    pub address: String,
    pub city: String,
    pub postcode: String,
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url_links: Vec<UrlLink>,
    pub registrator: String,
    pub register_date: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Owner {
    pub company: AccountId,
    pub quantity: Quantity,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CommercialPaper {
    pub cusip: Cusip,
    pub ticker: String,
    pub par: Decimal,
    pub qty: Quantity,
    /// Percent.
    pub discount: Decimal,
    /// Days from issue date.
    pub maturity: i64,
    #[serde(rename = "owner", deserialize_with = "null_as_default")]
    pub owners: Vec<Owner>,
    pub issuer: AccountId,
    /// Epoch milliseconds.
    pub issue_date: String,
}

impl CommercialPaper {
    pub fn outstanding(&self) -> Quantity {
        self.owners.iter().map(|o| o.quantity).sum()
    }

    /// Quantity held by `company`; the first matching owner entry wins.
    pub fn holding(&self, company: &str) -> Option<Quantity> {
        self.owners
            .iter()
            .find(|o| o.company == company)
            .map(|o| o.quantity)
    }

    pub(crate) fn owner_mut(&mut self, company: &str) -> Option<&mut Owner> {
        self.owners.iter_mut().find(|o| o.company == company)
    }

    /// Adds `quantity` to the first entry of `company`, appending one if absent.
    pub(crate) fn credit_owner(&mut self, company: &str, quantity: Quantity) -> LedgerResult<()> {
        match self.owner_mut(company) {
            Some(owner) => {
                owner.quantity = owner.quantity.checked_add(quantity).ok_or_else(|| {
                    LedgerError::invalid(format!("holding of {company} overflows"))
                })?;
            }
            None => self.owners.push(Owner {
                company: company.to_string(),
                quantity,
            }),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(alias = "CUSIP")]
    pub cusip: Cusip,
    pub from_company: AccountId,
    pub to_company: AccountId,
    pub quantity: Quantity,
}

/// Outcome of a settled transfer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub cusip: Cusip,
    pub from_company: AccountId,
    pub to_company: AccountId,
    pub quantity: Quantity,
    pub amount: Decimal,
}
