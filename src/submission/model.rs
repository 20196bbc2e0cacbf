//! Task Submission Model
//!
//! A submission is created when a user starts a task and carries a
//! snapshot of the effective policy and tier parameters captured at that
//! moment; later tier changes never apply retroactively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trust::tier::TierConfig;
use crate::validation::policy::EffectivePolicy;
use crate::validation::rules::{Platform, TaskType};

/// Primary lifecycle states. `flagged` is an orthogonal overlay, not a
/// state: a submission can be flagged without leaving its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Started,
    Pending,
    Verified,
    Released,
    Rejected,
    Reversed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Started => "started",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Verified => "verified",
            SubmissionStatus::Released => "released",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Reversed => "reversed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Released | SubmissionStatus::Rejected | SubmissionStatus::Reversed
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence supplied by the user when attempting to submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub platform_username: Option<String>,
    pub comment_text: Option<String>,
    pub content_answer: Option<String>,
    pub screenshot_ref: Option<String>,
    pub attestation_confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub id: Uuid,
    pub task_id: String,
    pub user_id: String,
    pub platform: Platform,
    pub task_type: TaskType,

    /// Policy and tier parameters captured at start.
    pub policy: EffectivePolicy,
    pub tier: TierConfig,

    /// Chosen at creation, immutable thereafter.
    pub content_question: String,

    pub platform_username: Option<String>,
    pub comment_text: Option<String>,
    pub content_answer: Option<String>,
    pub screenshot_ref: Option<String>,
    pub attestation_confirmed: bool,

    /// Elapsed engagement seconds; monotone while started, frozen once
    /// the submission leaves `started`.
    pub timer_seconds: u32,

    /// floor(base_reward * plan_multiplier), computed at start.
    pub capsules_earned: i64,

    pub status: SubmissionStatus,
    pub flagged: bool,
    pub flag_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl TaskSubmission {
    /// When the reward becomes releasable, per the snapshot tier. Advisory
    /// in the current design; release remains moderator-triggered.
    pub fn release_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
            .map(|verified_at| verified_at + self.tier.pending_duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SubmissionStatus::Released.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
        assert!(SubmissionStatus::Reversed.is_terminal());
        assert!(!SubmissionStatus::Started.is_terminal());
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(!SubmissionStatus::Verified.is_terminal());
    }
}
