//! Commercial paper issuance and transfer.
//!
//! A CUSIP is the issuer's account prefix followed by two characters that
//! encode the maturity date (month, then day of month). Issuing again with
//! the same maturity date accumulates quantity under the existing CUSIP.
//!
//! Settlement uses a flat discount: `amount = qty * par`, reduced by
//! `amount * discount% * maturity / basis`. The adjustment ignores how much
//! time has passed since issuance; it is not an accrual model.

use chrono::{DateTime, Datelike, Days, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::{
    accounts,
    codec::{self, Lookup},
    config::LedgerConfig,
    error::{LedgerError, LedgerResult},
    index::{self, RegistryKind},
    keys,
    ledger::Ledger,
    model::{Account, CommercialPaper, Owner, Quantity, Settlement, TransferRequest},
    store::KvStore,
};

/// Maturity-date suffix for a paper issued at `issue_date` (epoch millis,
/// interpreted in UTC) maturing after `maturity_days`.
pub fn cusip_suffix(
    config: &LedgerConfig,
    issue_date: &str,
    maturity_days: i64,
) -> LedgerResult<String> {
    let invalid = || LedgerError::InvalidDate {
        value: issue_date.to_string(),
    };
    let millis: i64 = issue_date.trim().parse().map_err(|_| invalid())?;
    let issued = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(invalid)?;
    let days = u64::try_from(maturity_days)
        .map_err(|_| LedgerError::invalid("maturity cannot be negative"))?;
    let matures = issued
        .date_naive()
        .checked_add_days(Days::new(days))
        .ok_or_else(invalid)?;

    let month = config.month_code(matures.month()).ok_or_else(invalid)?;
    let day = config.day_code(matures.day()).ok_or_else(invalid)?;
    Ok(format!("{month}{day}"))
}

fn overflow(what: &str) -> LedgerError {
    LedgerError::invalid(format!("{what} overflows the supported range"))
}

/// Share of face value taken off by the discount, as a percentage.
fn discount_percent(
    config: &LedgerConfig,
    discount: Decimal,
    maturity: i64,
) -> LedgerResult<Decimal> {
    discount
        .checked_mul(Decimal::from(maturity))
        .and_then(|d| d.checked_div(Decimal::from(config.day_count_basis)))
        .ok_or_else(|| overflow("discount over maturity"))
}

/// Cash paid by the buyer for `quantity` units of `paper`.
pub fn settlement_amount(
    config: &LedgerConfig,
    paper: &CommercialPaper,
    quantity: Quantity,
) -> LedgerResult<Decimal> {
    let gross = Decimal::from(quantity)
        .checked_mul(paper.par)
        .ok_or_else(|| overflow("settlement amount"))?;
    let percent = discount_percent(config, paper.discount, paper.maturity)?;
    let discount = gross
        .checked_mul(percent)
        .and_then(|d| d.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("settlement discount"))?;
    let amount = gross
        .checked_sub(discount)
        .ok_or_else(|| overflow("settlement amount"))?
        .round_dp_with_strategy(config.settlement_scale, RoundingStrategy::MidpointNearestEven);
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::invalid(format!(
            "discount on paper {} exceeds its face value",
            paper.cusip
        )));
    }
    Ok(amount)
}

fn validate_issue(config: &LedgerConfig, request: &CommercialPaper) -> LedgerResult<()> {
    if request.issuer.trim().is_empty() {
        return Err(LedgerError::invalid("issuer cannot be blank"));
    }
    if request.qty <= 0 {
        return Err(LedgerError::invalid(format!(
            "quantity must be positive, got {}",
            request.qty
        )));
    }
    if request.maturity < 0 {
        return Err(LedgerError::invalid("maturity cannot be negative"));
    }
    if request.par.is_sign_negative() || request.discount.is_sign_negative() {
        return Err(LedgerError::invalid("par and discount cannot be negative"));
    }
    if discount_percent(config, request.discount, request.maturity)? > Decimal::ONE_HUNDRED {
        return Err(LedgerError::invalid(format!(
            "discount of {}% over {} days exceeds face value",
            request.discount, request.maturity
        )));
    }
    Decimal::from(request.qty)
        .checked_mul(request.par)
        .ok_or_else(|| overflow("face value"))?;
    Ok(())
}

fn validate_transfer(request: &TransferRequest) -> LedgerResult<()> {
    if request.quantity <= 0 {
        return Err(LedgerError::invalid(format!(
            "quantity must be positive, got {}",
            request.quantity
        )));
    }
    if request.from_company == request.to_company {
        return Err(LedgerError::invalid("cannot transfer paper to its current owner"));
    }
    Ok(())
}

impl<S: KvStore> Ledger<S> {
    pub fn issue_json(&self, raw: &str) -> LedgerResult<CommercialPaper> {
        self.issue(codec::decode_request("commercial paper", raw)?)
    }

    /// Issues new paper, or adds quantity to an existing CUSIP.
    pub fn issue(&self, request: CommercialPaper) -> LedgerResult<CommercialPaper> {
        validate_issue(self.config(), &request)?;
        let mut staged = self.stage();

        let request_issuer = request.issuer.clone();
        let mut issuer: Account = codec::load(&staged, "account", &keys::account(&request_issuer))?;
        let suffix = cusip_suffix(self.config(), &request.issue_date, request.maturity)?;
        let cusip = format!("{}{}", issuer.prefix, suffix);
        let key = keys::paper(&cusip);

        let paper = match codec::lookup::<CommercialPaper, _>(&staged, &key)? {
            Lookup::Absent => {
                let paper = CommercialPaper {
                    cusip: cusip.clone(),
                    owners: vec![Owner {
                        company: request.issuer.clone(),
                        quantity: request.qty,
                    }],
                    ..request
                };
                codec::stage(&mut staged, &key, &paper)?;
                index::ensure_registered(&mut staged, RegistryKind::Papers, &key)?;
                info!(cusip = %cusip, issuer = %paper.issuer, qty = paper.qty, "paper issued");
                paper
            }
            Lookup::Found(mut existing) => {
                existing.qty = existing
                    .qty
                    .checked_add(request.qty)
                    .ok_or_else(|| overflow("issued quantity"))?;
                Decimal::from(existing.qty)
                    .checked_mul(existing.par)
                    .ok_or_else(|| overflow("face value"))?;
                existing.credit_owner(&request.issuer, request.qty)?;
                codec::stage(&mut staged, &key, &existing)?;
                info!(cusip = %cusip, added = request.qty, qty = existing.qty, "paper re-issued");
                existing
            }
            Lookup::Unreadable(reason) => {
                return Err(LedgerError::Validation(format!(
                    "stored paper {cusip} is unreadable: {reason}"
                )))
            }
        };

        accounts::stage_account(&mut staged, &request_issuer, &mut issuer)?;
        staged.commit()?;
        Ok(paper)
    }

    pub fn transfer_json(&self, raw: &str) -> LedgerResult<Settlement> {
        self.transfer(codec::decode_request("transfer", raw)?)
    }

    /// Moves `quantity` units from seller to buyer and settles the cash leg.
    /// All writes land in one batch.
    pub fn transfer(&self, request: TransferRequest) -> LedgerResult<Settlement> {
        validate_transfer(&request)?;
        let mut staged = self.stage();

        let paper_key = keys::paper(&request.cusip);
        let mut paper: CommercialPaper = codec::load(&staged, "paper", &paper_key)?;
        let mut seller: Account =
            codec::load(&staged, "account", &keys::account(&request.from_company))?;
        let mut buyer: Account =
            codec::load(&staged, "account", &keys::account(&request.to_company))?;

        let owned = paper
            .holding(&request.from_company)
            .ok_or_else(|| LedgerError::NotOwner {
                company: request.from_company.clone(),
                cusip: request.cusip.clone(),
            })?;
        if owned < request.quantity {
            return Err(LedgerError::InsufficientQuantity {
                company: request.from_company.clone(),
                cusip: request.cusip.clone(),
                owned,
                requested: request.quantity,
            });
        }

        let amount = settlement_amount(self.config(), &paper, request.quantity)?;
        if buyer.cash_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                company: request.to_company.clone(),
                required: amount,
                available: buyer.cash_balance,
            });
        }
        debug!(cusip = %request.cusip, %amount, "settling transfer");

        buyer.cash_balance = buyer
            .cash_balance
            .checked_sub(amount)
            .ok_or_else(|| overflow("buyer balance"))?;
        seller.cash_balance = seller
            .cash_balance
            .checked_add(amount)
            .ok_or_else(|| overflow("seller balance"))?;

        // seller entries stay in the list even when they reach zero
        if let Some(entry) = paper.owner_mut(&request.from_company) {
            entry.quantity -= request.quantity;
        }
        paper.credit_owner(&request.to_company, request.quantity)?;

        // batch order is buyer, seller, paper; holdings are refreshed once
        // the new owner list is visible in the overlay
        codec::stage(&mut staged, &keys::account(&request.to_company), &buyer)?;
        codec::stage(&mut staged, &keys::account(&request.from_company), &seller)?;
        codec::stage(&mut staged, &paper_key, &paper)?;
        accounts::stage_account(&mut staged, &request.to_company, &mut buyer)?;
        accounts::stage_account(&mut staged, &request.from_company, &mut seller)?;
        staged.commit()?;

        info!(
            cusip = %request.cusip,
            from = %request.from_company,
            to = %request.to_company,
            quantity = request.quantity,
            %amount,
            "paper transferred"
        );
        Ok(Settlement {
            cusip: request.cusip,
            from_company: request.from_company,
            to_company: request.to_company,
            quantity: request.quantity,
            amount,
        })
    }

    /// Looks a paper up by CUSIP or by its full `cp:` key.
    pub fn paper(&self, cusip: &str) -> LedgerResult<CommercialPaper> {
        let key = if cusip.starts_with(keys::PAPER_PREFIX) {
            cusip.to_string()
        } else {
            keys::paper(cusip)
        };
        codec::load(&self.stage(), "paper", &key)
    }

    pub fn papers(&self) -> LedgerResult<Vec<CommercialPaper>> {
        let staged = self.stage();
        let registry = index::list_all(&staged, RegistryKind::Papers)?;
        registry
            .keys()
            .iter()
            .map(|key| codec::load(&staged, "paper", key))
            .collect()
    }
}
