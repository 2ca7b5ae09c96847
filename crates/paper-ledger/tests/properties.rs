//! Property-based tests for the ledger invariants.
//!
//! 1. QUANTITY: for every paper, the owner entries sum to `qty` and none is
//!    negative.
//! 2. CASH: transfers move cash between accounts, never create or destroy it.
//! 3. HOLDINGS: an account's asset ids are exactly the papers it holds a
//!    positive quantity of.
//! 4. ATOMICITY: a rejected invocation leaves the store byte-for-byte intact.

use paper_ledger::{
    model::{CommercialPaper, TransferRequest},
    paper::cusip_suffix,
    Ledger, LedgerConfig, MemoryStore,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const COMPANIES: u32 = 3;
// 2016-01-01T00:00:00Z
const ISSUE_DATE_MS: i64 = 1_451_606_400_000;

#[derive(Clone, Debug)]
enum Op {
    Issue {
        issuer: u32,
        qty: i64,
        par: i64,
        maturity: i64,
        /// Half-percent steps.
        discount: u32,
    },
    Transfer {
        paper: usize,
        from: u32,
        to: u32,
        qty: i64,
    },
    /// `createAccounts` over the existing companies.
    Recreate,
}

// maturities up to ~55 years and discounts up to 100% reach settlement
// amounts at and beyond face value
fn issue_op() -> impl Strategy<Value = Op> {
    (
        1..=COMPANIES,
        1..500i64,
        prop_oneof![Just(1i64), 1..100_000i64],
        0..20_000i64,
        0..=200u32,
    )
        .prop_map(|(issuer, qty, par, maturity, discount)| Op::Issue {
            issuer,
            qty,
            par,
            maturity,
            discount,
        })
}

fn transfer_op() -> impl Strategy<Value = Op> {
    (0..8usize, 1..=COMPANIES, 1..=COMPANIES, 1..600i64)
        .prop_map(|(paper, from, to, qty)| Op::Transfer { paper, from, to, qty })
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![issue_op(), transfer_op()]
}

fn op_with_recreate() -> impl Strategy<Value = Op> {
    prop_oneof![4 => issue_op(), 4 => transfer_op(), 1 => Just(Op::Recreate)]
}

fn company(n: u32) -> String {
    format!("company{n}")
}

fn fresh_ledger() -> Ledger<MemoryStore> {
    let ledger = Ledger::with_defaults(MemoryStore::new());
    ledger.init().unwrap();
    ledger.create_accounts(COMPANIES).unwrap();
    ledger
}

fn apply(ledger: &Ledger<MemoryStore>, op: &Op) -> bool {
    match op {
        Op::Issue {
            issuer,
            qty,
            par,
            maturity,
            discount,
        } => ledger
            .issue(CommercialPaper {
                ticker: "PROP".into(),
                par: Decimal::from(*par),
                qty: *qty,
                discount: Decimal::new(i64::from(*discount) * 5, 1),
                maturity: *maturity,
                issuer: company(*issuer),
                issue_date: ISSUE_DATE_MS.to_string(),
                ..CommercialPaper::default()
            })
            .is_ok(),
        Op::Transfer { paper, from, to, qty } => {
            let papers = ledger.papers().unwrap();
            if papers.is_empty() {
                return false;
            }
            let cusip = papers[paper % papers.len()].cusip.clone();
            ledger
                .transfer(TransferRequest {
                    cusip,
                    from_company: company(*from),
                    to_company: company(*to),
                    quantity: *qty,
                })
                .is_ok()
        }
        Op::Recreate => ledger.create_accounts(COMPANIES).is_ok(),
    }
}

fn total_cash(ledger: &Ledger<MemoryStore>) -> Decimal {
    (1..=COMPANIES)
        .map(|n| ledger.account(&company(n)).unwrap().cash_balance)
        .sum()
}

proptest! {
    #[test]
    fn prop_owner_quantities_sum_to_issued(ops in prop::collection::vec(op(), 1..30)) {
        let ledger = fresh_ledger();
        for op in &ops {
            apply(&ledger, op);
            for paper in ledger.papers().unwrap() {
                prop_assert_eq!(
                    paper.outstanding(),
                    paper.qty,
                    "paper {} out of balance",
                    paper.cusip
                );
                prop_assert!(paper.owners.iter().all(|o| o.quantity >= 0));
            }
        }
    }

    #[test]
    fn prop_transfers_conserve_cash(ops in prop::collection::vec(op(), 1..30)) {
        let ledger = fresh_ledger();
        let start = total_cash(&ledger);
        for op in &ops {
            apply(&ledger, op);
            prop_assert_eq!(total_cash(&ledger), start);
        }
    }

    #[test]
    fn prop_balances_never_go_negative(ops in prop::collection::vec(op(), 1..30)) {
        let ledger = fresh_ledger();
        for op in &ops {
            apply(&ledger, op);
            for n in 1..=COMPANIES {
                let cash = ledger.account(&company(n)).unwrap().cash_balance;
                prop_assert!(
                    !cash.is_sign_negative() || cash.is_zero(),
                    "company{} at {}",
                    n,
                    cash
                );
            }
        }
    }

    #[test]
    fn prop_asset_ids_track_positive_holdings(
        ops in prop::collection::vec(op_with_recreate(), 1..30),
    ) {
        let ledger = fresh_ledger();
        for op in &ops {
            apply(&ledger, op);
        }
        for n in 1..=COMPANIES {
            let id = company(n);
            let account = ledger.account(&id).unwrap();
            let expected: Vec<String> = ledger
                .papers()
                .unwrap()
                .into_iter()
                .filter(|p| p.holding(&id).is_some_and(|q| q > 0))
                .map(|p| p.cusip)
                .collect();
            prop_assert_eq!(account.asset_ids, expected);
        }
    }

    #[test]
    fn prop_rejected_ops_leave_state_untouched(ops in prop::collection::vec(op(), 1..30)) {
        let ledger = fresh_ledger();
        for op in &ops {
            let before = ledger.store().state_digest();
            if !apply(&ledger, op) {
                prop_assert_eq!(ledger.store().state_digest(), before);
            }
        }
    }

    #[test]
    fn prop_cusip_suffix_uses_configured_tables(
        offset_days in 0..20_000i64,
        maturity in 0..3_650i64,
    ) {
        let config = LedgerConfig::default();
        let millis = ISSUE_DATE_MS + offset_days * 86_400_000;
        let suffix = cusip_suffix(&config, &millis.to_string(), maturity).unwrap();
        let chars: Vec<char> = suffix.chars().collect();
        prop_assert_eq!(chars.len(), 2);
        prop_assert!(config.month_codes.contains(chars[0]));
        prop_assert!(config.day_codes.contains(chars[1]));
    }
}
