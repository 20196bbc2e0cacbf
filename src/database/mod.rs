//! PostgreSQL persistence layer. The engine is fully functional without
//! a database; repositories mirror the in-memory state for durability.

pub mod ledger;
pub mod pool;
pub mod submissions;
pub mod trust;

pub use ledger::LedgerRepository;
pub use pool::DatabasePool;
pub use submissions::SubmissionRepository;
pub use trust::TrustRepository;
