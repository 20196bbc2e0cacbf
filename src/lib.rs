//! Capsule Task Engine
//!
//! Trust-gated task validation and reward-release engine for a
//! social-engagement marketplace: users complete tasks (like, comment,
//! follow, watch, visit) for Capsules, the platform's virtual currency.
//! The engine decides per user and per task what evidence is required,
//! how long the user must wait, how much is paid and when, and how the
//! user's trust score evolves in response to verified or disputed
//! behavior.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── trust/         - Trust scores, tiers, penalties
//! │   ├── tier.rs    - Score -> tier resolution
//! │   ├── score.rs   - Per-user trust record
//! │   ├── penalty.rs - Signals, slashing, cooldowns
//! │   └── manager.rs - Trust orchestrator
//! ├── validation/    - Evidence requirements
//! │   ├── rules.rs   - Per-task-type rule table
//! │   ├── policy.rs  - Tier-scaled effective policy
//! │   └── questions.rs - Content verification questions
//! ├── submission/    - Submission lifecycle
//! │   ├── model.rs   - Submission record & states
//! │   ├── machine.rs - State machine (try_advance, moderation)
//! │   └── dedup.rs   - Duplicate evidence detection
//! ├── ledger/        - Capsule accounting
//! │   ├── entry.rs   - Append-only entries
//! │   └── ledger.rs  - Atomic credit/debit with audit invariant
//! ├── username.rs    - Best-effort username-ownership oracle client
//! ├── api/           - HTTP API endpoints
//! └── database/      - PostgreSQL persistence
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod ledger;
pub mod submission;
pub mod trust;
pub mod username;
pub mod validation;

// Re-export main types for convenience
pub use config::{EngineConfig, RewardTable, TrustPolicyConfig, UsernameOracleConfig};
pub use database::pool::DatabasePool;
pub use ledger::{CapsuleLedger, EntryType, LedgerEntry, LedgerError};
pub use submission::{
    Evidence, SubmissionEngine, SubmissionError, SubmissionStatus, TaskSubmission,
};
pub use trust::{
    PenaltyEngine, PenaltyPolicy, TierConfig, TierTable, TrustManager, TrustScore, TrustSignal,
    TrustTier,
};
pub use username::UsernameOracle;
pub use validation::{
    effective_policy, EffectivePolicy, Platform, QuestionPool, RuleSet, TaskType, ValidationRule,
};

// Re-export API types
pub use api::{
    create_ledger_router, create_submission_router, create_trust_router, LedgerApiState,
    SubmissionApiState, TrustApiState,
};
