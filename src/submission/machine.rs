//! Task Submission State Machine
//!
//! Owns the submission lifecycle:
//!
//! ```text
//! started -> pending -> {verified, rejected}
//! verified -> released
//! verified | released -> reversed
//! ```
//!
//! `flagged` is an orthogonal overlay that suspends progression without
//! changing the primary state. The started -> pending transition is a
//! single atomic `try_advance`: either every evidence check passes, or
//! nothing is persisted. Moderation transitions use an expected-status
//! check so racing decisions can never double-apply.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RewardTable;
use crate::database::pool::DatabasePool;
use crate::ledger::{CapsuleLedger, EntryType, LedgerError};
use crate::submission::dedup::{EvidenceCheck, EvidenceTracker};
use crate::submission::model::{Evidence, SubmissionStatus, TaskSubmission};
use crate::trust::manager::TrustManager;
use crate::trust::penalty::{PenaltyEngine, TrustSignal};
use crate::validation::policy::effective_policy;
use crate::validation::questions::QuestionPool;
use crate::validation::rules::{Platform, RuleSet, TaskType};

#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    #[error("validation incomplete: {}", .0.join("; "))]
    ValidationIncomplete(Vec<String>),

    #[error("invalid transition: cannot {action} a submission in state {from}")]
    InvalidTransition {
        from: SubmissionStatus,
        action: &'static str,
    },

    #[error("rejection requires non-empty review notes")]
    MissingRejectionReason,

    #[error("rate or cap exceeded: {0}")]
    RateOrCapExceeded(String),

    #[error("submission is flagged for manual review")]
    Flagged,

    #[error("submission not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct SubmissionEngine {
    rules: RuleSet,
    rewards: RewardTable,
    trust: Arc<TrustManager>,
    ledger: Arc<CapsuleLedger>,
    penalties: Arc<PenaltyEngine>,
    tracker: RwLock<EvidenceTracker>,
    store: RwLock<HashMap<Uuid, TaskSubmission>>,
    db: Option<Arc<DatabasePool>>,
}

impl SubmissionEngine {
    pub fn new(
        rules: RuleSet,
        rewards: RewardTable,
        trust: Arc<TrustManager>,
        ledger: Arc<CapsuleLedger>,
        penalties: Arc<PenaltyEngine>,
    ) -> Self {
        Self {
            rules,
            rewards,
            trust,
            ledger,
            penalties,
            tracker: RwLock::new(EvidenceTracker::new()),
            store: RwLock::new(HashMap::new()),
            db: None,
        }
    }

    pub fn with_database(mut self, db: Arc<DatabasePool>) -> Self {
        self.db = Some(db);
        self
    }

    async fn persist(&self, submission: &TaskSubmission) {
        if let Some(ref db) = self.db {
            if let Err(e) = db.submissions().upsert(submission).await {
                warn!(submission_id = %submission.id, error = %e, "Failed to persist submission");
            }
        }
    }

    /// Capsules attributed to this user's submissions today, excluding
    /// ones moderation has voided. Gates the per-tier daily cap.
    async fn earned_today(&self, user_id: &str) -> i64 {
        let today = Utc::now().date_naive();
        let store = self.store.read().await;
        store
            .values()
            .filter(|s| {
                s.user_id == user_id
                    && s.created_at.date_naive() == today
                    && !matches!(
                        s.status,
                        SubmissionStatus::Rejected | SubmissionStatus::Reversed
                    )
            })
            .map(|s| s.capsules_earned)
            .sum()
    }

    /// Start a task for a user: gate on cooldown, tier, and daily cap,
    /// then snapshot the effective policy, the content question, and the
    /// reward into a new `started` submission.
    pub async fn start_task(
        &self,
        user_id: &str,
        task_id: &str,
        task_type: TaskType,
        platform: Platform,
        plan: &str,
    ) -> Result<TaskSubmission, SubmissionError> {
        let score = self.trust.get_score(user_id).await;
        if score.is_on_cooldown() {
            let until = score
                .cooldown_until
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            return Err(SubmissionError::RateOrCapExceeded(format!(
                "cooldown active until {until}"
            )));
        }

        let tier = self.trust.tier_for(user_id).await;
        if !tier.can_start_tasks() {
            return Err(SubmissionError::RateOrCapExceeded(
                "account suspended; new task starts are not allowed".to_string(),
            ));
        }

        if let Some(cap) = tier.daily_earning_cap {
            let earned_today = self.earned_today(user_id).await;
            if earned_today >= cap {
                return Err(SubmissionError::RateOrCapExceeded(format!(
                    "daily earning cap of {cap} capsules reached"
                )));
            }
        }

        let policy = effective_policy(&self.rules, task_type, &tier);
        let base_reward = self.rewards.base_reward(task_type);
        let multiplier = self.rewards.plan_multiplier(plan);
        let capsules_earned = (base_reward as f64 * multiplier).floor() as i64;

        let submission = TaskSubmission {
            id: Uuid::new_v4(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            platform,
            task_type,
            policy,
            tier,
            content_question: QuestionPool::pick(task_type),
            platform_username: None,
            comment_text: None,
            content_answer: None,
            screenshot_ref: None,
            attestation_confirmed: false,
            timer_seconds: 0,
            capsules_earned,
            status: SubmissionStatus::Started,
            flagged: false,
            flag_reason: None,
            created_at: Utc::now(),
            verified_at: None,
            released_at: None,
            review_notes: None,
        };

        {
            let mut store = self.store.write().await;
            store.insert(submission.id, submission.clone());
        }
        self.trust.record_task_started(user_id).await;
        self.persist(&submission).await;

        info!(
            submission_id = %submission.id,
            user_id = %user_id,
            task_type = task_type.as_str(),
            capsules = capsules_earned,
            required_seconds = policy.required_seconds,
            "Task started"
        );
        Ok(submission)
    }

    /// Advance the engagement timer. Monotone: the recorded value never
    /// decreases. Only meaningful while the submission is `started`.
    pub async fn record_timer(&self, id: Uuid, seconds: u32) -> Result<u32, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;
        if submission.status != SubmissionStatus::Started {
            return Err(SubmissionError::InvalidTransition {
                from: submission.status,
                action: "record timer on",
            });
        }
        submission.timer_seconds = submission.timer_seconds.max(seconds);
        Ok(submission.timer_seconds)
    }

    /// The single started -> pending entry point. Checks the snapshot
    /// policy's requirements atomically; on any gap the submission stays
    /// `started` and no evidence is persisted.
    pub async fn try_advance(
        &self,
        id: Uuid,
        evidence: Evidence,
    ) -> Result<TaskSubmission, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;

        if submission.status != SubmissionStatus::Started {
            return Err(SubmissionError::InvalidTransition {
                from: submission.status,
                action: "submit",
            });
        }
        if submission.flagged {
            return Err(SubmissionError::Flagged);
        }

        let policy = submission.policy;
        let mut gaps = Vec::new();

        if submission.timer_seconds < policy.required_seconds {
            gaps.push(format!(
                "engagement timer at {}s of {}s required",
                submission.timer_seconds, policy.required_seconds
            ));
        }
        if policy.requires_username
            && evidence
                .platform_username
                .as_deref()
                .map_or(true, |u| u.trim().len() < 2)
        {
            gaps.push("platform username missing or too short".to_string());
        }
        if policy.requires_comment
            && evidence
                .comment_text
                .as_deref()
                .map_or(true, |c| c.trim().len() < 5)
        {
            gaps.push("comment text missing or too short".to_string());
        }
        if evidence
            .content_answer
            .as_deref()
            .map_or(true, |a| a.trim().len() < 3)
        {
            gaps.push("content answer missing or too short".to_string());
        }
        if policy.screenshot_required
            && evidence
                .screenshot_ref
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            gaps.push("screenshot missing".to_string());
        }
        if !evidence.attestation_confirmed {
            gaps.push("truthfulness attestation not confirmed".to_string());
        }
        if !gaps.is_empty() {
            return Err(SubmissionError::ValidationIncomplete(gaps));
        }

        // A timer past the rule's plausibility ceiling points at a spoofed
        // counter; hold the submission for manual review.
        if submission.timer_seconds > policy.max_timer_seconds {
            submission.flagged = true;
            submission.flag_reason = Some(format!(
                "timer of {}s exceeds the {}s plausibility bound",
                submission.timer_seconds, policy.max_timer_seconds
            ));
            warn!(submission_id = %id, "Submission flagged: implausible timer");
            return Err(SubmissionError::Flagged);
        }

        // All checks passed: commit the evidence and freeze the timer.
        submission.platform_username = evidence.platform_username;
        submission.comment_text = evidence.comment_text;
        submission.content_answer = evidence.content_answer;
        submission.screenshot_ref = evidence.screenshot_ref;
        submission.attestation_confirmed = true;
        submission.status = SubmissionStatus::Pending;

        // Duplicate evidence is tolerated for retries, flagged otherwise.
        // A flag here still lets the submission reach `pending`; it blocks
        // verification and release until a moderator resolves it.
        let evidence_hash = EvidenceTracker::compute_evidence_hash(
            submission.task_type.as_str(),
            submission.comment_text.as_deref(),
            submission.content_answer.as_deref().unwrap_or_default(),
        );
        let check = {
            let mut tracker = self.tracker.write().await;
            tracker.record(id, &submission.task_id, &submission.user_id, evidence_hash)
        };
        if let EvidenceCheck::Flagged(flags) = check {
            submission.flagged = true;
            submission.flag_reason = Some(format!("duplicate evidence: {flags:?}"));
        }

        let snapshot = submission.clone();
        drop(store);
        self.persist(&snapshot).await;

        debug!(submission_id = %id, "Submission advanced to pending");
        Ok(snapshot)
    }

    /// Moderation: pending -> verified. Refused while flagged.
    pub async fn verify(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<TaskSubmission, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;

        if submission.status != SubmissionStatus::Pending {
            return Err(SubmissionError::InvalidTransition {
                from: submission.status,
                action: "verify",
            });
        }
        if submission.flagged {
            return Err(SubmissionError::Flagged);
        }

        submission.status = SubmissionStatus::Verified;
        submission.verified_at = Some(Utc::now());
        submission.review_notes = notes;

        let snapshot = submission.clone();
        drop(store);
        self.persist(&snapshot).await;

        info!(submission_id = %id, "Submission verified");
        Ok(snapshot)
    }

    /// Moderation: pending -> rejected. Requires non-empty notes; an
    /// empty-reason rejection is refused. Applies the dispute penalty.
    pub async fn reject(&self, id: Uuid, notes: &str) -> Result<TaskSubmission, SubmissionError> {
        if notes.trim().is_empty() {
            return Err(SubmissionError::MissingRejectionReason);
        }

        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;

        if submission.status != SubmissionStatus::Pending {
            return Err(SubmissionError::InvalidTransition {
                from: submission.status,
                action: "reject",
            });
        }

        submission.status = SubmissionStatus::Rejected;
        submission.review_notes = Some(notes.to_string());
        let snapshot = submission.clone();
        drop(store);

        self.trust.record_rejection(&snapshot.user_id).await;
        self.penalties
            .apply_signal(&snapshot.user_id, TrustSignal::DisputeRaised)
            .await;
        self.persist(&snapshot).await;

        info!(submission_id = %id, "Submission rejected");
        Ok(snapshot)
    }

    /// Moderator-triggered: verified -> released. Credits the ledger for
    /// `capsules_earned` and applies the positive trust adjustment. The
    /// snapshot tier's `release_at` is advisory, not a hard gate; an early
    /// release is logged, not refused.
    pub async fn release(&self, id: Uuid) -> Result<TaskSubmission, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;

        if submission.status != SubmissionStatus::Verified {
            return Err(SubmissionError::InvalidTransition {
                from: submission.status,
                action: "release",
            });
        }
        if submission.flagged {
            return Err(SubmissionError::Flagged);
        }

        if let Some(release_at) = submission.release_at() {
            if Utc::now() < release_at {
                debug!(
                    submission_id = %id,
                    release_at = %release_at,
                    "Releasing ahead of the advisory hold window"
                );
            }
        }

        // The store lock is held across the credit so the status change
        // and the ledger effect are one unit.
        let balance = self
            .ledger
            .credit(
                &submission.user_id,
                submission.capsules_earned,
                EntryType::Earned,
                &format!(
                    "Task reward: {} on {}",
                    submission.task_type.as_str(),
                    submission.platform.as_str()
                ),
                Some(submission.id.to_string()),
            )
            .await?;

        submission.status = SubmissionStatus::Released;
        submission.released_at = Some(Utc::now());
        let snapshot = submission.clone();
        drop(store);

        self.trust
            .record_completion(&snapshot.user_id, snapshot.capsules_earned)
            .await;
        self.penalties
            .apply_signal(&snapshot.user_id, TrustSignal::TaskVerified)
            .await;
        self.persist(&snapshot).await;

        info!(
            submission_id = %id,
            user_id = %snapshot.user_id,
            capsules = snapshot.capsules_earned,
            balance,
            "Reward released"
        );
        Ok(snapshot)
    }

    /// Moderation: verified | released -> reversed, for late-discovered
    /// abuse. A released submission is slashed for more than it paid out;
    /// a merely verified one was never credited, so only the score drops.
    pub async fn reverse(&self, id: Uuid) -> Result<TaskSubmission, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;

        match submission.status {
            SubmissionStatus::Released => {
                self.penalties
                    .slash_reversal(
                        &submission.user_id,
                        &submission.id.to_string(),
                        submission.capsules_earned,
                    )
                    .await?;
            }
            SubmissionStatus::Verified => {
                self.penalties
                    .apply_signal(&submission.user_id, TrustSignal::TaskReversed)
                    .await;
            }
            other => {
                return Err(SubmissionError::InvalidTransition {
                    from: other,
                    action: "reverse",
                });
            }
        }

        submission.status = SubmissionStatus::Reversed;
        let snapshot = submission.clone();
        drop(store);

        self.trust.record_rejection(&snapshot.user_id).await;
        self.persist(&snapshot).await;

        info!(submission_id = %id, "Submission reversed");
        Ok(snapshot)
    }

    /// Flag a submission for manual review. Orthogonal to the primary
    /// state; allowed at any point, including after release.
    pub async fn flag(&self, id: Uuid, reason: &str) -> Result<TaskSubmission, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;
        submission.flagged = true;
        submission.flag_reason = Some(reason.to_string());
        let snapshot = submission.clone();
        drop(store);
        self.persist(&snapshot).await;
        Ok(snapshot)
    }

    /// Clear a flag after review; progression resumes where it left off.
    pub async fn unflag(&self, id: Uuid) -> Result<TaskSubmission, SubmissionError> {
        let mut store = self.store.write().await;
        let submission = store.get_mut(&id).ok_or(SubmissionError::NotFound(id))?;
        submission.flagged = false;
        submission.flag_reason = None;
        let snapshot = submission.clone();
        drop(store);
        self.persist(&snapshot).await;
        Ok(snapshot)
    }

    pub async fn get(&self, id: Uuid) -> Option<TaskSubmission> {
        let store = self.store.read().await;
        store.get(&id).cloned()
    }

    pub async fn list_for_user(&self, user_id: &str) -> Vec<TaskSubmission> {
        let store = self.store.read().await;
        let mut submissions: Vec<TaskSubmission> = store
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        submissions.sort_by_key(|s| s.created_at);
        submissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::penalty::PenaltyPolicy;
    use crate::trust::tier::TierTable;

    struct Harness {
        engine: SubmissionEngine,
        trust: Arc<TrustManager>,
        ledger: Arc<CapsuleLedger>,
    }

    fn harness() -> Harness {
        let trust = Arc::new(TrustManager::new(TierTable::default()));
        let ledger = Arc::new(CapsuleLedger::new());
        let penalties = Arc::new(PenaltyEngine::new(
            trust.clone(),
            ledger.clone(),
            PenaltyPolicy::default(),
        ));
        let engine = SubmissionEngine::new(
            RuleSet::default(),
            RewardTable::default(),
            trust.clone(),
            ledger.clone(),
            penalties,
        );
        Harness {
            engine,
            trust,
            ledger,
        }
    }

    fn full_evidence() -> Evidence {
        Evidence {
            platform_username: Some("@alice".to_string()),
            comment_text: Some("great post!".to_string()),
            content_answer: Some("blue".to_string()),
            screenshot_ref: Some("shots/abc123.png".to_string()),
            attestation_confirmed: true,
        }
    }

    async fn started_comment_task(h: &Harness, user: &str) -> TaskSubmission {
        let sub = h
            .engine
            .start_task(user, "task_1", TaskType::Comment, Platform::Instagram, "free")
            .await
            .unwrap();
        h.engine.record_timer(sub.id, 30).await.unwrap();
        sub
    }

    #[tokio::test]
    async fn test_start_snapshots_policy_and_reward() {
        let h = harness();
        let sub = h
            .engine
            .start_task("user_1", "task_1", TaskType::Comment, Platform::Instagram, "free")
            .await
            .unwrap();

        assert_eq!(sub.status, SubmissionStatus::Started);
        assert_eq!(sub.policy.required_seconds, 30);
        assert_eq!(sub.capsules_earned, 10);
        assert!(!sub.content_question.is_empty());
    }

    #[tokio::test]
    async fn test_reward_floors_plan_multiplier() {
        let h = harness();
        let sub = h
            .engine
            .start_task("user_1", "task_1", TaskType::Like, Platform::Tiktok, "premium")
            .await
            .unwrap();
        // base 5 * 1.5 = 7.5 -> 7
        assert_eq!(sub.capsules_earned, 7);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_start() {
        let h = harness();
        h.trust.set_cooldown("user_1", 24.0).await;

        let err = h
            .engine
            .start_task("user_1", "task_1", TaskType::Like, Platform::Tiktok, "free")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::RateOrCapExceeded(_)));
    }

    #[tokio::test]
    async fn test_suspended_tier_blocks_start() {
        let h = harness();
        h.trust.adjust_score("user_1", -45).await; // 50 -> 5

        let err = h
            .engine
            .start_task("user_1", "task_1", TaskType::Like, Platform::Tiktok, "free")
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::RateOrCapExceeded(_)));
    }

    #[tokio::test]
    async fn test_daily_cap_blocks_start() {
        let h = harness();
        h.trust.adjust_score("user_1", -25).await; // restricted, cap 40

        // watch pays 12 against a cap of 40: the cap trips once the
        // day's sum reaches it.
        let mut refused = false;
        for i in 0..6 {
            match h
                .engine
                .start_task(
                    "user_1",
                    &format!("task_{i}"),
                    TaskType::Watch,
                    Platform::Youtube,
                    "free",
                )
                .await
            {
                Ok(_) => {}
                Err(SubmissionError::RateOrCapExceeded(reason)) => {
                    assert!(reason.contains("daily earning cap"));
                    refused = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(refused, "cap never tripped");
    }

    #[tokio::test]
    async fn test_timer_is_monotone() {
        let h = harness();
        let sub = started_comment_task(&h, "user_1").await;
        assert_eq!(h.engine.record_timer(sub.id, 10).await.unwrap(), 30);
        assert_eq!(h.engine.record_timer(sub.id, 45).await.unwrap(), 45);
    }

    #[tokio::test]
    async fn test_advance_refused_below_required_timer() {
        let h = harness();
        let sub = h
            .engine
            .start_task("user_1", "task_1", TaskType::Comment, Platform::Instagram, "free")
            .await
            .unwrap();
        h.engine.record_timer(sub.id, 29).await.unwrap();

        let err = h.engine.try_advance(sub.id, full_evidence()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::ValidationIncomplete(_)));
        assert_eq!(
            h.engine.get(sub.id).await.unwrap().status,
            SubmissionStatus::Started
        );
    }

    #[tokio::test]
    async fn test_answer_length_boundary() {
        let h = harness();

        let sub = started_comment_task(&h, "user_1").await;
        let mut evidence = full_evidence();
        evidence.content_answer = Some("ab".to_string());
        let err = h.engine.try_advance(sub.id, evidence).await.unwrap_err();
        assert!(matches!(err, SubmissionError::ValidationIncomplete(_)));

        let mut evidence = full_evidence();
        evidence.content_answer = Some("abc".to_string());
        let advanced = h.engine.try_advance(sub.id, evidence).await.unwrap();
        assert_eq!(advanced.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_failed_advance_persists_no_evidence() {
        let h = harness();
        let sub = started_comment_task(&h, "user_1").await;

        let mut evidence = full_evidence();
        evidence.screenshot_ref = None;
        h.engine.try_advance(sub.id, evidence).await.unwrap_err();

        let current = h.engine.get(sub.id).await.unwrap();
        assert!(current.comment_text.is_none());
        assert!(current.content_answer.is_none());
        assert!(!current.attestation_confirmed);
    }

    #[tokio::test]
    async fn test_visit_needs_no_username() {
        let h = harness();
        let sub = h
            .engine
            .start_task("user_1", "task_1", TaskType::Visit, Platform::Website, "free")
            .await
            .unwrap();
        h.engine.record_timer(sub.id, 20).await.unwrap();

        let mut evidence = full_evidence();
        evidence.platform_username = None;
        evidence.comment_text = None;
        let advanced = h.engine.try_advance(sub.id, evidence).await.unwrap();
        assert_eq!(advanced.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_implausible_timer_flags_submission() {
        let h = harness();
        let sub = started_comment_task(&h, "user_1").await;
        h.engine.record_timer(sub.id, 700).await.unwrap(); // comment max 600

        let err = h.engine.try_advance(sub.id, full_evidence()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Flagged));
        let current = h.engine.get(sub.id).await.unwrap();
        assert!(current.flagged);
        assert_eq!(current.status, SubmissionStatus::Started);
    }

    #[tokio::test]
    async fn test_rejection_requires_notes() {
        let h = harness();
        let sub = started_comment_task(&h, "user_1").await;
        h.engine.try_advance(sub.id, full_evidence()).await.unwrap();

        let err = h.engine.reject(sub.id, "   ").await.unwrap_err();
        assert!(matches!(err, SubmissionError::MissingRejectionReason));

        let rejected = h.engine.reject(sub.id, "screenshot does not match").await.unwrap();
        assert_eq!(rejected.status, SubmissionStatus::Rejected);

        let score = h.trust.get_score("user_1").await;
        assert_eq!(score.total_tasks_rejected, 1);
        assert_eq!(score.score, 47); // 50 - 3
    }

    #[tokio::test]
    async fn test_release_credits_once_and_double_release_refused() {
        let h = harness();
        let sub = started_comment_task(&h, "user_1").await;
        h.engine.try_advance(sub.id, full_evidence()).await.unwrap();
        h.engine.verify(sub.id, None).await.unwrap();

        let released = h.engine.release(sub.id).await.unwrap();
        assert_eq!(released.status, SubmissionStatus::Released);
        assert_eq!(h.ledger.balance("user_1").await, 10);

        let err = h.engine.release(sub.id).await.unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidTransition { .. }));
        assert_eq!(h.ledger.balance("user_1").await, 10);
        assert_eq!(h.ledger.entries("user_1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_flag_blocks_verify_and_release() {
        let h = harness();
        let sub = started_comment_task(&h, "user_1").await;
        h.engine.try_advance(sub.id, full_evidence()).await.unwrap();

        h.engine.flag(sub.id, "manual audit").await.unwrap();
        assert!(matches!(
            h.engine.verify(sub.id, None).await.unwrap_err(),
            SubmissionError::Flagged
        ));

        h.engine.unflag(sub.id).await.unwrap();
        h.engine.verify(sub.id, None).await.unwrap();
        h.engine.flag(sub.id, "second look").await.unwrap();
        assert!(matches!(
            h.engine.release(sub.id).await.unwrap_err(),
            SubmissionError::Flagged
        ));
    }

    #[tokio::test]
    async fn test_reverse_released_slashes_more_than_credit() {
        let h = harness();

        // Put extra balance in place so the full slash lands.
        h.ledger
            .credit("user_1", 20, EntryType::Purchased, "capsule pack", None)
            .await
            .unwrap();

        let sub = h
            .engine
            .start_task("user_1", "task_1", TaskType::Watch, Platform::Youtube, "free")
            .await
            .unwrap();
        h.engine.record_timer(sub.id, 60).await.unwrap();
        h.engine.try_advance(sub.id, full_evidence()).await.unwrap();
        h.engine.verify(sub.id, None).await.unwrap();
        h.engine.release(sub.id).await.unwrap();
        assert_eq!(h.ledger.balance("user_1").await, 32); // 20 + 12

        let score_before = h.trust.get_score("user_1").await.score;
        let reversed = h.engine.reverse(sub.id).await.unwrap();
        assert_eq!(reversed.status, SubmissionStatus::Reversed);

        // slash = ceil(12 * 1.5) = 18
        assert_eq!(h.ledger.balance("user_1").await, 14);
        let score = h.trust.get_score("user_1").await;
        assert_eq!(score.score, score_before - 7);
        assert_eq!(score.total_capsules_slashed, 18);
        assert_eq!(score.total_tasks_rejected, 1);

        // Terminal: reversing again is refused.
        assert!(matches!(
            h.engine.reverse(sub.id).await.unwrap_err(),
            SubmissionError::InvalidTransition { .. }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_evidence_flags_second_user() {
        let h = harness();

        let first = started_comment_task(&h, "user_a").await;
        h.engine.try_advance(first.id, full_evidence()).await.unwrap();

        let second = started_comment_task(&h, "user_b").await;
        let advanced = h.engine.try_advance(second.id, full_evidence()).await.unwrap();

        assert_eq!(advanced.status, SubmissionStatus::Pending);
        assert!(advanced.flagged);
        assert!(matches!(
            h.engine.verify(second.id, None).await.unwrap_err(),
            SubmissionError::Flagged
        ));
    }
}
