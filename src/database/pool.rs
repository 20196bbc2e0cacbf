//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::ledger::LedgerRepository;
use crate::database::submissions::SubmissionRepository;
use crate::database::trust::TrustRepository;

pub struct DatabasePool {
    pool: PgPool,
    submissions: SubmissionRepository,
    ledger: LedgerRepository,
    trust: TrustRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str) -> Result<Self, String> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| format!("Failed to connect to PostgreSQL: {}", e))?;

        info!("Connected to PostgreSQL");

        let submissions = SubmissionRepository::new(pool.clone());
        let ledger = LedgerRepository::new(pool.clone());
        let trust = TrustRepository::new(pool.clone());

        Ok(Self {
            pool,
            submissions,
            ledger,
            trust,
        })
    }

    pub async fn init_schema(&self) -> Result<(), String> {
        info!("Initializing database schema...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                status TEXT NOT NULL,
                flagged BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL,
                payload JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create submissions table: {}", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions (user_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create submissions index: {}", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL,
                entry_type TEXT NOT NULL,
                amount BIGINT NOT NULL,
                balance_after BIGINT NOT NULL,
                description TEXT NOT NULL,
                reference_id TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create ledger table: {}", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ledger_user ON ledger_entries (user_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create ledger index: {}", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trust_scores (
                user_id TEXT PRIMARY KEY,
                score INT NOT NULL,
                cooldown_until TIMESTAMPTZ,
                total_capsules_earned BIGINT NOT NULL,
                total_capsules_slashed BIGINT NOT NULL,
                total_tasks_completed BIGINT NOT NULL,
                total_tasks_rejected BIGINT NOT NULL,
                last_task_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to create trust table: {}", e))?;

        info!("Database schema initialized");
        Ok(())
    }

    pub fn submissions(&self) -> &SubmissionRepository {
        &self.submissions
    }

    pub fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    pub fn trust(&self) -> &TrustRepository {
        &self.trust
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
