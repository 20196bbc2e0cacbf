//! Ledger Entry Definitions
//!
//! Immutable rows in the per-user capsule transaction log. `balance_after`
//! is the audit trail: it must equal the running sum of all prior amounts
//! for the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Earned,
    Spent,
    AdminCredit,
    AdminDebit,
    Purchased,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Earned => "earned",
            EntryType::Spent => "spent",
            EntryType::AdminCredit => "admin_credit",
            EntryType::AdminDebit => "admin_debit",
            EntryType::Purchased => "purchased",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "earned" => Some(EntryType::Earned),
            "spent" => Some(EntryType::Spent),
            "admin_credit" => Some(EntryType::AdminCredit),
            "admin_debit" => Some(EntryType::AdminDebit),
            "purchased" => Some(EntryType::Purchased),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub entry_type: EntryType,

    /// Signed: positive for credits, negative for debits.
    pub amount: i64,

    /// Materialized balance immediately after this entry was appended.
    pub balance_after: i64,

    pub description: String,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        user_id: &str,
        entry_type: EntryType,
        amount: i64,
        balance_after: i64,
        description: &str,
        reference_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            entry_type,
            amount,
            balance_after,
            description: description.to_string(),
            reference_id,
            created_at: Utc::now(),
        }
    }
}
