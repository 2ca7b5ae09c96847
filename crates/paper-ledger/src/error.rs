use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Failure of a ledger invocation or query.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or missing input, including an empty derived id.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Create-once violation.
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    /// Referenced entity or registry is absent (or unreadable).
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// Comparison fields differ from the stored record.
    #[error("{kind} {id} verification failed")]
    VerificationFailed { kind: &'static str, id: String },

    /// Issue date is not an integer number of epoch milliseconds.
    #[error("invalid issue date {value:?}")]
    InvalidDate { value: String },

    #[error("company {company} does not own any of paper {cusip}")]
    NotOwner { company: String, cusip: String },

    #[error("company {company} owns {owned} of paper {cusip}, {requested} requested")]
    InsufficientQuantity {
        company: String,
        cusip: String,
        owned: i64,
        requested: i64,
    },

    #[error("company {company} holds {available} cash, {required} required")]
    InsufficientFunds {
        company: String,
        required: Decimal,
        available: Decimal,
    },

    /// Registry bytes exist but do not decode as a key list.
    #[error("registry {registry} is corrupt: {reason}")]
    IndexCorrupt { registry: String, reason: String },

    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    /// A record could not be encoded for storage.
    #[error("encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        LedgerError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
