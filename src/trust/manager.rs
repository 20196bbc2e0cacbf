//! Trust Manager
//!
//! Orchestrates trust score reads and mutations: an in-memory cache of
//! per-user scores, optional database persistence, and tier resolution
//! through the injected tier table.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::database::pool::DatabasePool;
use crate::trust::score::TrustScore;
use crate::trust::tier::{TierConfig, TierTable};

pub struct TrustManager {
    db: Option<Arc<DatabasePool>>,
    table: TierTable,

    /// In-memory cache of scores (authoritative between persists).
    cache: Arc<RwLock<HashMap<String, TrustScore>>>,
}

impl TrustManager {
    pub fn new(table: TierTable) -> Self {
        Self {
            db: None,
            table,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_database(mut self, db: Arc<DatabasePool>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn tier_table(&self) -> &TierTable {
        &self.table
    }

    /// Get or create the trust record for a user.
    pub async fn get_score(&self, user_id: &str) -> TrustScore {
        {
            let cache = self.cache.read().await;
            if let Some(score) = cache.get(user_id) {
                return score.clone();
            }
        }

        if let Some(ref db) = self.db {
            if let Ok(Some(score)) = db.trust().get_score(user_id).await {
                let mut cache = self.cache.write().await;
                cache.insert(user_id.to_string(), score.clone());
                return score;
            }
        }

        TrustScore::new(user_id.to_string())
    }

    /// Resolve the user's current tier from their clamped score.
    pub async fn tier_for(&self, user_id: &str) -> TierConfig {
        let score = self.get_score(user_id).await;
        self.table.resolve(score.score.clamp(0, 100)).clone()
    }

    async fn save(&self, score: TrustScore) {
        if let Some(ref db) = self.db {
            if let Err(e) = db.trust().upsert_score(&score).await {
                warn!(user_id = %score.user_id, error = %e, "Failed to persist trust score");
            }
        }
        let mut cache = self.cache.write().await;
        cache.insert(score.user_id.clone(), score);
    }

    /// Apply a signed delta to a user's score, clamped to [0,100].
    /// Returns the new score.
    pub async fn adjust_score(&self, user_id: &str, delta: i32) -> i32 {
        let mut score = self.get_score(user_id).await;
        let new_score = score.adjust(delta);
        debug!(user_id = %user_id, delta, new_score, "Trust score adjusted");
        self.save(score).await;
        new_score
    }

    /// Set (hours > 0) or clear (hours == 0) the user's cooldown.
    pub async fn set_cooldown(&self, user_id: &str, hours: f64) {
        let mut score = self.get_score(user_id).await;
        score.set_cooldown(hours);
        debug!(user_id = %user_id, hours, "Cooldown updated");
        self.save(score).await;
    }

    pub async fn is_on_cooldown(&self, user_id: &str) -> bool {
        self.get_score(user_id).await.is_on_cooldown()
    }

    /// Record that the user started a task.
    pub async fn record_task_started(&self, user_id: &str) {
        let mut score = self.get_score(user_id).await;
        score.last_task_at = Some(chrono::Utc::now());
        self.save(score).await;
    }

    /// Record a released task: lifetime earnings and completion count.
    pub async fn record_completion(&self, user_id: &str, capsules: i64) {
        let mut score = self.get_score(user_id).await;
        score.total_tasks_completed += 1;
        score.total_capsules_earned += capsules;
        score.updated_at = chrono::Utc::now();
        self.save(score).await;
    }

    /// Record a rejected or reversed task.
    pub async fn record_rejection(&self, user_id: &str) {
        let mut score = self.get_score(user_id).await;
        score.total_tasks_rejected += 1;
        score.updated_at = chrono::Utc::now();
        self.save(score).await;
    }

    /// Record capsules removed by slashing.
    pub async fn record_slashed(&self, user_id: &str, capsules: i64) {
        let mut score = self.get_score(user_id).await;
        score.total_capsules_slashed += capsules;
        score.updated_at = chrono::Utc::now();
        self.save(score).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::tier::TrustTier;

    #[tokio::test]
    async fn test_new_user_lands_in_normal_tier() {
        let manager = TrustManager::new(TierTable::default());
        let tier = manager.tier_for("user_1").await;
        assert_eq!(tier.tier, TrustTier::Normal);
    }

    #[tokio::test]
    async fn test_adjust_persists_in_cache() {
        let manager = TrustManager::new(TierTable::default());
        assert_eq!(manager.adjust_score("user_1", 15).await, 65);
        assert_eq!(manager.get_score("user_1").await.score, 65);
    }

    #[tokio::test]
    async fn test_adjust_moves_tier() {
        let manager = TrustManager::new(TierTable::default());
        manager.adjust_score("user_1", -25).await;
        assert_eq!(manager.tier_for("user_1").await.tier, TrustTier::Restricted);
    }

    #[tokio::test]
    async fn test_cooldown_round_trip() {
        let manager = TrustManager::new(TierTable::default());
        manager.set_cooldown("user_1", 24.0).await;
        assert!(manager.is_on_cooldown("user_1").await);
        manager.set_cooldown("user_1", 0.0).await;
        assert!(!manager.is_on_cooldown("user_1").await);
    }

    #[tokio::test]
    async fn test_completion_counters() {
        let manager = TrustManager::new(TierTable::default());
        manager.record_completion("user_1", 10).await;
        manager.record_completion("user_1", 5).await;
        manager.record_rejection("user_1").await;

        let score = manager.get_score("user_1").await;
        assert_eq!(score.total_tasks_completed, 2);
        assert_eq!(score.total_capsules_earned, 15);
        assert_eq!(score.total_tasks_rejected, 1);
    }
}
