//! Capsule ledger: append-only entries and per-user balances.

pub mod entry;
pub mod ledger;

pub use entry::{EntryType, LedgerEntry};
pub use ledger::{CapsuleLedger, LedgerError};
