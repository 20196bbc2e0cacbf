//! HTTP API endpoints for the capsule task engine
//!
//! Provides REST APIs for:
//! - Submissions (task start, evidence, moderation transitions)
//! - Trust (score/tier reads, signals, cooldowns)
//! - Ledger (balances, history, credits/debits, audit)

use axum::http::StatusCode;

pub mod ledger;
pub mod submissions;
pub mod trust;

pub use ledger::{create_ledger_router, LedgerApiState};
pub use submissions::{create_submission_router, SubmissionApiState};
pub use trust::{create_trust_router, TrustApiState};

/// Validate an admin API key against the configured one.
pub(crate) fn check_admin(
    configured: &Option<String>,
    provided: &str,
) -> Result<(), (StatusCode, String)> {
    match configured {
        Some(key) if key == provided => Ok(()),
        Some(_) => Err((StatusCode::FORBIDDEN, "Invalid admin API key".to_string())),
        None => Err((
            StatusCode::FORBIDDEN,
            "Admin API key not configured".to_string(),
        )),
    }
}
