//! Per-Task-Type Validation Rules
//!
//! Immutable configuration describing what evidence each task type
//! requires and the bounds on its engagement timer. Tier scaling is
//! applied on top of these by the policy layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The engagement actions users are paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Like,
    Comment,
    Follow,
    Watch,
    Visit,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::Like,
        TaskType::Comment,
        TaskType::Follow,
        TaskType::Watch,
        TaskType::Visit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Like => "like",
            TaskType::Comment => "comment",
            TaskType::Follow => "follow",
            TaskType::Watch => "watch",
            TaskType::Visit => "visit",
        }
    }
}

/// Platforms tasks can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Tiktok,
    Youtube,
    Twitter,
    Facebook,
    Website,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Website => "website",
        }
    }
}

/// Evidence requirements and timer bounds for one task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub min_timer_seconds: u32,
    pub max_timer_seconds: u32,
    pub requires_comment: bool,
    pub requires_username: bool,
    pub requires_content_question: bool,
}

/// The full rule table, one entry per task type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    rules: HashMap<TaskType, ValidationRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            TaskType::Like,
            ValidationRule {
                min_timer_seconds: 15,
                max_timer_seconds: 300,
                requires_comment: false,
                requires_username: true,
                requires_content_question: true,
            },
        );
        rules.insert(
            TaskType::Comment,
            ValidationRule {
                min_timer_seconds: 30,
                max_timer_seconds: 600,
                requires_comment: true,
                requires_username: true,
                requires_content_question: true,
            },
        );
        rules.insert(
            TaskType::Follow,
            ValidationRule {
                min_timer_seconds: 10,
                max_timer_seconds: 180,
                requires_comment: false,
                requires_username: true,
                requires_content_question: true,
            },
        );
        rules.insert(
            TaskType::Watch,
            ValidationRule {
                min_timer_seconds: 60,
                max_timer_seconds: 1800,
                requires_comment: false,
                requires_username: true,
                requires_content_question: true,
            },
        );
        // Website visits claim no account action, so no username.
        rules.insert(
            TaskType::Visit,
            ValidationRule {
                min_timer_seconds: 20,
                max_timer_seconds: 600,
                requires_comment: false,
                requires_username: false,
                requires_content_question: true,
            },
        );
        Self { rules }
    }
}

impl RuleSet {
    pub fn rule_for(&self, task_type: TaskType) -> ValidationRule {
        // The table is exhaustive by construction; the unreachable default
        // keeps this total if a partial table is ever deserialized.
        self.rules
            .get(&task_type)
            .copied()
            .unwrap_or(ValidationRule {
                min_timer_seconds: 60,
                max_timer_seconds: 1800,
                requires_comment: false,
                requires_username: true,
                requires_content_question: true,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table_is_exhaustive() {
        let rules = RuleSet::default();
        for task_type in TaskType::ALL {
            let rule = rules.rule_for(task_type);
            assert!(rule.min_timer_seconds > 0);
            assert!(rule.max_timer_seconds > rule.min_timer_seconds);
            assert!(rule.requires_content_question);
        }
    }

    #[test]
    fn test_visit_is_sole_type_without_username() {
        let rules = RuleSet::default();
        for task_type in TaskType::ALL {
            let rule = rules.rule_for(task_type);
            assert_eq!(rule.requires_username, task_type != TaskType::Visit);
        }
    }

    #[test]
    fn test_only_comment_requires_comment_text() {
        let rules = RuleSet::default();
        assert!(rules.rule_for(TaskType::Comment).requires_comment);
        assert!(!rules.rule_for(TaskType::Like).requires_comment);
    }
}
