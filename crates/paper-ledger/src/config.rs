//! Ledger configuration.
//!
//! Loaded once at start-up and handed to [`crate::Ledger`] by value; nothing
//! mutates it afterwards.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Appended to an account id (or bulk counter) to form the CUSIP prefix.
    pub account_suffix: String,
    pub starting_balance: Decimal,
    /// Seventh CUSIP character, indexed by maturity month (1-12).
    pub month_codes: String,
    /// Eighth CUSIP character, indexed by maturity day of month (1-31).
    pub day_codes: String,
    /// Decimal places kept on settlement amounts.
    pub settlement_scale: u32,
    /// Denominator of the maturity fraction in the discount adjustment.
    pub day_count_basis: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_suffix: "000A".to_string(),
            starting_balance: Decimal::new(1_000_000_000, 2),
            month_codes: "ABCDEFGHJKLM".to_string(),
            day_codes: "123456789ABCDEFGHJKLMNPQRSTUVWX".to_string(),
            settlement_scale: 2,
            day_count_basis: 360,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.month_codes.chars().count() != 12 {
            return Err(ConfigError::Invalid(format!(
                "month_codes must hold 12 characters, got {}",
                self.month_codes.chars().count()
            )));
        }
        if self.day_codes.chars().count() != 31 {
            return Err(ConfigError::Invalid(format!(
                "day_codes must hold 31 characters, got {}",
                self.day_codes.chars().count()
            )));
        }
        if self.day_count_basis == 0 {
            return Err(ConfigError::Invalid("day_count_basis must be > 0".into()));
        }
        if self.starting_balance.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "starting_balance must not be negative".into(),
            ));
        }
        if self.settlement_scale > 10 {
            return Err(ConfigError::Invalid(
                "settlement_scale must be at most 10".into(),
            ));
        }
        Ok(())
    }

    pub fn month_code(&self, month: u32) -> Option<char> {
        code_at(&self.month_codes, month)
    }

    pub fn day_code(&self, day: u32) -> Option<char> {
        code_at(&self.day_codes, day)
    }
}

fn code_at(table: &str, one_based: u32) -> Option<char> {
    let idx = usize::try_from(one_based.checked_sub(1)?).ok()?;
    table.chars().nth(idx)
}
