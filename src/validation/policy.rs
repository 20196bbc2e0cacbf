//! Effective Validation Policy
//!
//! Combines the per-task-type rule with the user's tier at submission
//! start. The result is snapshot into the submission: a user whose tier
//! worsens mid-task is still judged by the policy they started under.

use serde::{Deserialize, Serialize};

use crate::trust::tier::TierConfig;
use crate::validation::rules::{RuleSet, TaskType};

/// The policy a single submission is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePolicy {
    pub task_type: TaskType,

    /// Tier-scaled minimum engagement time, rounded up.
    pub required_seconds: u32,

    /// Upper plausibility bound from the rule table (not tier-scaled).
    pub max_timer_seconds: u32,

    pub requires_username: bool,
    pub requires_comment: bool,
    pub requires_content_question: bool,
    pub screenshot_required: bool,
}

/// Compute the effective policy for a task type under a tier.
///
/// `required_seconds = ceil(min_timer * tier.timer_multiplier)`.
pub fn effective_policy(
    rules: &RuleSet,
    task_type: TaskType,
    tier: &TierConfig,
) -> EffectivePolicy {
    let rule = rules.rule_for(task_type);
    let required_seconds = (rule.min_timer_seconds as f64 * tier.timer_multiplier).ceil() as u32;

    EffectivePolicy {
        task_type,
        required_seconds,
        max_timer_seconds: rule.max_timer_seconds,
        requires_username: rule.requires_username,
        requires_comment: rule.requires_comment,
        requires_content_question: true,
        screenshot_required: tier.screenshot_required,
    }
}
