//! Ledger Repository - PostgreSQL operations for ledger entries using sqlx
//!
//! Entries are append-only: there is no update or delete path, matching
//! the audit-trail contract.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::ledger::entry::{EntryType, LedgerEntry};

pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries
            (id, user_id, entry_type, amount, balance_after, description, reference_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(entry.entry_type.as_str())
        .bind(entry.amount)
        .bind(entry.balance_after)
        .bind(&entry.description)
        .bind(&entry.reference_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to insert ledger entry: {}", e))?;

        debug!(user_id = %entry.user_id, amount = entry.amount, "Ledger entry persisted");
        Ok(())
    }

    pub async fn entries_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, String> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, entry_type, amount, balance_after, description,
                   reference_id, created_at
            FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to get ledger entries: {}", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_type: String = row.get("entry_type");
            let entry_type = EntryType::from_str(&entry_type)
                .ok_or_else(|| format!("Unknown ledger entry type: {}", entry_type))?;

            let id: Uuid = row.get("id");
            let created_at: DateTime<Utc> = row.get("created_at");
            entries.push(LedgerEntry {
                id,
                user_id: row.get("user_id"),
                entry_type,
                amount: row.get("amount"),
                balance_after: row.get("balance_after"),
                description: row.get("description"),
                reference_id: row.get("reference_id"),
                created_at,
            });
        }
        Ok(entries)
    }

    pub async fn latest_balance(&self, user_id: &str) -> Result<Option<i64>, String> {
        let row = sqlx::query(
            r#"
            SELECT balance_after FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to get latest balance: {}", e))?;

        Ok(row.map(|r| r.get("balance_after")))
    }
}
