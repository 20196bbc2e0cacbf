//! Validation rules, effective policies, and content questions.

pub mod policy;
pub mod questions;
pub mod rules;

pub use policy::{effective_policy, EffectivePolicy};
pub use questions::QuestionPool;
pub use rules::{Platform, RuleSet, TaskType, ValidationRule};
