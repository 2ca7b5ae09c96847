//! Commercial-paper ledger engine.
//!
//! The crate implements the state transitions of a small commercial-paper
//! marketplace on top of a store that only offers point reads and writes:
//!
//! * [`store`]: the [`KvStore`] boundary, a staged write overlay and two
//!   bundled adapters (in-memory and JSON file).
//! * [`index`]: registries that make persons, companies and papers
//!   enumerable.
//! * [`model`] / [`codec`]: the persisted records and their byte encoding.
//! * [`identity`]: create-once registration and verification of persons and
//!   companies.
//! * [`accounts`]: cash accounts and the derived holdings view.
//! * [`paper`]: CUSIP derivation, issuance and transfer with settlement.
//! * [`dispatch`]: named invocations and queries routed to the above.
//!
//! Every invocation stages its writes and commits them as one batch, so the
//! bundled stores never observe a half-applied transfer.

pub mod accounts;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod identity;
pub mod index;
pub mod keys;
pub mod model;
pub mod paper;
pub mod store;

mod error;
mod ledger;

pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use store::{FileStore, KvStore, MemoryStore, StoreError, WriteBatch};
