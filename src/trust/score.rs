//! Trust Score Record
//!
//! One record per user (or anonymous identifier). The score is clamped to
//! [0,100]; scores are adjusted by the penalty engine and by submission
//! outcomes, never deleted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Where new users start: bottom of the normal tier.
pub const STARTING_SCORE: i32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustScore {
    pub user_id: String,

    /// Clamped to [0,100]. Tier is derived from this, never stored.
    pub score: i32,

    /// While set and in the future, new task starts are refused.
    pub cooldown_until: Option<DateTime<Utc>>,

    pub total_capsules_earned: i64,
    pub total_capsules_slashed: i64,
    pub total_tasks_completed: u64,
    pub total_tasks_rejected: u64,
    pub last_task_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrustScore {
    pub fn new(user_id: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            score: STARTING_SCORE,
            cooldown_until: None,
            total_capsules_earned: 0,
            total_capsules_slashed: 0,
            total_tasks_completed: 0,
            total_tasks_rejected: 0,
            last_task_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a signed delta, clamping to [0,100]. Returns the new score.
    pub fn adjust(&mut self, delta: i32) -> i32 {
        self.score = (self.score + delta).clamp(MIN_SCORE, MAX_SCORE);
        self.updated_at = Utc::now();
        self.score
    }

    /// Set a cooldown for the given number of hours; zero clears it.
    pub fn set_cooldown(&mut self, hours: f64) {
        self.cooldown_until = if hours <= 0.0 {
            None
        } else {
            Some(Utc::now() + Duration::seconds((hours * 3600.0) as i64))
        };
        self.updated_at = Utc::now();
    }

    pub fn is_on_cooldown(&self) -> bool {
        matches!(self.cooldown_until, Some(until) if Utc::now() < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_score_starts_in_normal_range() {
        let score = TrustScore::new("user_1".to_string());
        assert_eq!(score.score, STARTING_SCORE);
        assert!(!score.is_on_cooldown());
    }

    #[test]
    fn test_adjust_clamps_both_ends() {
        let mut score = TrustScore::new("user_1".to_string());
        assert_eq!(score.adjust(1000), MAX_SCORE);
        assert_eq!(score.adjust(-1000), MIN_SCORE);
        assert_eq!(score.adjust(-7), MIN_SCORE);
    }

    #[test]
    fn test_cooldown_zero_clears() {
        let mut score = TrustScore::new("user_1".to_string());
        score.set_cooldown(48.0);
        assert!(score.is_on_cooldown());
        score.set_cooldown(0.0);
        assert!(!score.is_on_cooldown());
        assert!(score.cooldown_until.is_none());
    }
}
