//! Trust Repository - PostgreSQL operations for trust scores using sqlx

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::trust::score::TrustScore;

pub struct TrustRepository {
    pool: PgPool,
}

impl TrustRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_score(&self, score: &TrustScore) -> Result<(), String> {
        sqlx::query(
            r#"
            INSERT INTO trust_scores
            (user_id, score, cooldown_until, total_capsules_earned, total_capsules_slashed,
             total_tasks_completed, total_tasks_rejected, last_task_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                score = EXCLUDED.score,
                cooldown_until = EXCLUDED.cooldown_until,
                total_capsules_earned = EXCLUDED.total_capsules_earned,
                total_capsules_slashed = EXCLUDED.total_capsules_slashed,
                total_tasks_completed = EXCLUDED.total_tasks_completed,
                total_tasks_rejected = EXCLUDED.total_tasks_rejected,
                last_task_at = EXCLUDED.last_task_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&score.user_id)
        .bind(score.score)
        .bind(score.cooldown_until)
        .bind(score.total_capsules_earned)
        .bind(score.total_capsules_slashed)
        .bind(score.total_tasks_completed as i64)
        .bind(score.total_tasks_rejected as i64)
        .bind(score.last_task_at)
        .bind(score.created_at)
        .bind(score.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to upsert trust score: {}", e))?;

        debug!(user_id = %score.user_id, score = score.score, "Trust score persisted");
        Ok(())
    }

    pub async fn get_score(&self, user_id: &str) -> Result<Option<TrustScore>, String> {
        let row = sqlx::query(
            r#"
            SELECT user_id, score, cooldown_until, total_capsules_earned, total_capsules_slashed,
                   total_tasks_completed, total_tasks_rejected, last_task_at, created_at, updated_at
            FROM trust_scores
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| format!("Failed to get trust score: {}", e))?;

        match row {
            Some(row) => {
                let total_tasks_completed: i64 = row.get("total_tasks_completed");
                let total_tasks_rejected: i64 = row.get("total_tasks_rejected");
                let cooldown_until: Option<DateTime<Utc>> = row.get("cooldown_until");
                let last_task_at: Option<DateTime<Utc>> = row.get("last_task_at");

                Ok(Some(TrustScore {
                    user_id: row.get("user_id"),
                    score: row.get("score"),
                    cooldown_until,
                    total_capsules_earned: row.get("total_capsules_earned"),
                    total_capsules_slashed: row.get("total_capsules_slashed"),
                    total_tasks_completed: total_tasks_completed.max(0) as u64,
                    total_tasks_rejected: total_tasks_rejected.max(0) as u64,
                    last_task_at,
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }))
            }
            None => Ok(None),
        }
    }
}
