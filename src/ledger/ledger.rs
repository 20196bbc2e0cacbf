//! Capsule Ledger
//!
//! Append-only transaction log plus materialized balance per user. The
//! read-modify-write of the balance and the append of the entry are one
//! atomic unit under a per-user lock; operations on different users
//! proceed independently.
//!
//! A detected balance/entry mismatch is never repaired automatically:
//! the account is halted for debits pending manual audit.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::database::pool::DatabasePool;
use crate::ledger::entry::{EntryType, LedgerEntry};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("ledger amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("account halted pending manual audit")]
    AccountHalted,
}

#[derive(Debug, Default)]
struct Account {
    balance: i64,
    entries: Vec<LedgerEntry>,

    /// Set when the audit invariant fails; blocks further debits.
    halted: bool,
}

pub struct CapsuleLedger {
    accounts: RwLock<HashMap<String, Arc<Mutex<Account>>>>,
    db: Option<Arc<DatabasePool>>,
}

impl CapsuleLedger {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<DatabasePool>) -> Self {
        self.db = Some(db);
        self
    }

    async fn account(&self, user_id: &str) -> Arc<Mutex<Account>> {
        {
            let accounts = self.accounts.read().await;
            if let Some(account) = accounts.get(user_id) {
                return account.clone();
            }
        }
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Account::default())))
            .clone()
    }

    async fn persist(&self, entry: &LedgerEntry) {
        if let Some(ref db) = self.db {
            if let Err(e) = db.ledger().insert_entry(entry).await {
                warn!(user_id = %entry.user_id, error = %e, "Failed to persist ledger entry");
            }
        }
    }

    /// Credit `amount` capsules to a user. Returns the new balance.
    ///
    /// Credits are accepted even on a halted account so externally owed
    /// funds are never dropped; only debits are blocked by a halt.
    pub async fn credit(
        &self,
        user_id: &str,
        amount: i64,
        entry_type: EntryType,
        description: &str,
        reference_id: Option<String>,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount));
        }

        let account = self.account(user_id).await;
        let mut account = account.lock().await;

        account.balance += amount;
        let entry = LedgerEntry::new(
            user_id,
            entry_type,
            amount,
            account.balance,
            description,
            reference_id,
        );
        account.entries.push(entry.clone());
        let balance = account.balance;
        drop(account);

        self.persist(&entry).await;

        debug!(user_id = %user_id, amount, balance, entry_type = entry_type.as_str(), "Capsules credited");
        Ok(balance)
    }

    /// Debit `amount` capsules. Fails hard with `InsufficientBalance` if
    /// the amount exceeds the current balance; no partial debit occurs.
    pub async fn debit(
        &self,
        user_id: &str,
        amount: i64,
        entry_type: EntryType,
        description: &str,
        reference_id: Option<String>,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount));
        }

        let account = self.account(user_id).await;
        let mut account = account.lock().await;

        if account.halted {
            return Err(LedgerError::AccountHalted);
        }
        if amount > account.balance {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: account.balance,
            });
        }

        account.balance -= amount;
        let entry = LedgerEntry::new(
            user_id,
            entry_type,
            -amount,
            account.balance,
            description,
            reference_id,
        );
        account.entries.push(entry.clone());
        let balance = account.balance;
        drop(account);

        self.persist(&entry).await;

        debug!(user_id = %user_id, amount, balance, entry_type = entry_type.as_str(), "Capsules debited");
        Ok(balance)
    }

    /// Debit up to `amount`, capped at the current balance. Used by
    /// admin debits and reversal slashing, which must always take effect
    /// but may never drive a balance negative. Returns (debited, balance).
    pub async fn debit_capped(
        &self,
        user_id: &str,
        amount: i64,
        entry_type: EntryType,
        description: &str,
        reference_id: Option<String>,
    ) -> Result<(i64, i64), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::NonPositiveAmount(amount));
        }

        let account = self.account(user_id).await;
        let mut account = account.lock().await;

        if account.halted {
            return Err(LedgerError::AccountHalted);
        }

        let debited = amount.min(account.balance);
        if debited == 0 {
            return Ok((0, account.balance));
        }

        account.balance -= debited;
        let entry = LedgerEntry::new(
            user_id,
            entry_type,
            -debited,
            account.balance,
            description,
            reference_id,
        );
        account.entries.push(entry.clone());
        let balance = account.balance;
        drop(account);

        self.persist(&entry).await;

        debug!(user_id = %user_id, requested = amount, debited, balance, "Capped debit applied");
        Ok((debited, balance))
    }

    pub async fn balance(&self, user_id: &str) -> i64 {
        let account = self.account(user_id).await;
        let account = account.lock().await;
        account.balance
    }

    pub async fn entries(&self, user_id: &str) -> Vec<LedgerEntry> {
        let account = self.account(user_id).await;
        let account = account.lock().await;
        account.entries.clone()
    }

    pub async fn is_halted(&self, user_id: &str) -> bool {
        let account = self.account(user_id).await;
        let account = account.lock().await;
        account.halted
    }

    /// Recompute the running sum over the user's entries and compare each
    /// `balance_after` and the materialized balance against it.
    ///
    /// On mismatch the account is halted for debits; the ledger is never
    /// rewritten to "fix" the discrepancy.
    pub async fn verify_audit_trail(&self, user_id: &str) -> bool {
        let account = self.account(user_id).await;
        let mut account = account.lock().await;

        let mut running = 0i64;
        for entry in &account.entries {
            running += entry.amount;
            if entry.balance_after != running {
                error!(
                    user_id = %user_id,
                    entry_id = %entry.id,
                    expected = running,
                    recorded = entry.balance_after,
                    "Ledger audit mismatch; halting account for debits"
                );
                account.halted = true;
                return false;
            }
        }

        if running != account.balance {
            error!(
                user_id = %user_id,
                expected = running,
                recorded = account.balance,
                "Materialized balance diverges from entry sum; halting account for debits"
            );
            account.halted = true;
            return false;
        }

        true
    }
}

impl Default for CapsuleLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_running_sum_invariant() {
        let ledger = CapsuleLedger::new();

        ledger
            .credit("user_1", 10, EntryType::Earned, "task reward", None)
            .await
            .unwrap();
        ledger
            .credit("user_1", 25, EntryType::Purchased, "capsule pack", None)
            .await
            .unwrap();
        ledger
            .debit("user_1", 5, EntryType::Spent, "boost", None)
            .await
            .unwrap();

        let entries = ledger.entries("user_1").await;
        let total: i64 = entries.iter().map(|e| e.amount).sum();
        assert_eq!(entries.last().unwrap().balance_after, total);
        assert_eq!(ledger.balance("user_1").await, 30);
        assert!(ledger.verify_audit_trail("user_1").await);
    }

    #[tokio::test]
    async fn test_debit_exceeding_balance_is_a_noop() {
        let ledger = CapsuleLedger::new();
        ledger
            .credit("user_1", 10, EntryType::Earned, "task reward", None)
            .await
            .unwrap();

        let err = ledger
            .debit("user_1", 11, EntryType::Spent, "boost", None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                requested: 11,
                available: 10
            }
        );
        assert_eq!(ledger.balance("user_1").await, 10);
        assert_eq!(ledger.entries("user_1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_capped_debit_never_goes_negative() {
        let ledger = CapsuleLedger::new();
        ledger
            .credit("user_1", 20, EntryType::Earned, "task reward", None)
            .await
            .unwrap();

        let (debited, balance) = ledger
            .debit_capped("user_1", 30, EntryType::AdminDebit, "reversal slash", None)
            .await
            .unwrap();
        assert_eq!(debited, 20);
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let ledger = CapsuleLedger::new();
        assert!(ledger
            .credit("user_1", 0, EntryType::Earned, "nothing", None)
            .await
            .is_err());
        assert!(ledger
            .debit("user_1", -5, EntryType::Spent, "nothing", None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_concurrent_credits_lose_no_update() {
        let ledger = Arc::new(CapsuleLedger::new());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .credit("user_1", 1, EntryType::Earned, "task reward", None)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ledger.balance("user_1").await, 50);
        assert_eq!(ledger.entries("user_1").await.len(), 50);
        assert!(ledger.verify_audit_trail("user_1").await);
    }

    #[tokio::test]
    async fn test_corruption_halts_debits_but_not_credits() {
        let ledger = CapsuleLedger::new();
        ledger
            .credit("user_1", 10, EntryType::Earned, "task reward", None)
            .await
            .unwrap();

        // Corrupt the materialized balance behind the audit's back.
        {
            let account = ledger.account("user_1").await;
            let mut account = account.lock().await;
            account.balance += 5;
        }

        assert!(!ledger.verify_audit_trail("user_1").await);
        assert!(ledger.is_halted("user_1").await);

        let err = ledger
            .debit("user_1", 1, EntryType::Spent, "boost", None)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::AccountHalted);

        // Credits still land so owed funds are not dropped.
        assert!(ledger
            .credit("user_1", 1, EntryType::Purchased, "capsule pack", None)
            .await
            .is_ok());
    }
}
