//! Submission Repository - PostgreSQL operations for submissions using sqlx
//!
//! Frequently-filtered fields live in indexed columns; the full
//! submission (including its policy and tier snapshot) rides along as a
//! JSONB payload so the snapshot survives schema-free.

use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::submission::model::TaskSubmission;

pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, submission: &TaskSubmission) -> Result<(), String> {
        let payload = serde_json::to_value(submission)
            .map_err(|e| format!("Failed to serialize submission: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO submissions (id, user_id, task_id, status, flagged, created_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                flagged = EXCLUDED.flagged,
                payload = EXCLUDED.payload
            "#,
        )
        .bind(submission.id)
        .bind(&submission.user_id)
        .bind(&submission.task_id)
        .bind(submission.status.as_str())
        .bind(submission.flagged)
        .bind(submission.created_at)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| format!("Failed to upsert submission: {}", e))?;

        debug!(submission_id = %submission.id, status = submission.status.as_str(), "Submission persisted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TaskSubmission>, String> {
        let row = sqlx::query("SELECT payload FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| format!("Failed to get submission: {}", e))?;

        match row {
            Some(row) => {
                let payload: serde_json::Value = row.get("payload");
                let submission = serde_json::from_value(payload)
                    .map_err(|e| format!("Failed to deserialize submission: {}", e))?;
                Ok(Some(submission))
            }
            None => Ok(None),
        }
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<TaskSubmission>, String> {
        let rows = sqlx::query(
            r#"
            SELECT payload FROM submissions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to list submissions: {}", e))?;

        let mut submissions = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: serde_json::Value = row.get("payload");
            let submission = serde_json::from_value(payload)
                .map_err(|e| format!("Failed to deserialize submission: {}", e))?;
            submissions.push(submission);
        }
        Ok(submissions)
    }

    pub async fn list_flagged(&self, limit: i64) -> Result<Vec<TaskSubmission>, String> {
        let rows = sqlx::query(
            r#"
            SELECT payload FROM submissions
            WHERE flagged = TRUE
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| format!("Failed to list flagged submissions: {}", e))?;

        let mut submissions = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: serde_json::Value = row.get("payload");
            let submission = serde_json::from_value(payload)
                .map_err(|e| format!("Failed to deserialize submission: {}", e))?;
            submissions.push(submission);
        }
        Ok(submissions)
    }
}
