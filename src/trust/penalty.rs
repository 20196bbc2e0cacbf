//! Penalty Engine
//!
//! Converts moderation and abuse signals into trust-score deltas, ledger
//! slashing, and cooldowns. Point values are policy and tunable; the sign
//! of each signal is contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ledger::{CapsuleLedger, EntryType, LedgerError};
use crate::trust::manager::TrustManager;

/// Signals that feed back into a user's trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustSignal {
    /// Task verified without dispute.
    TaskVerified,
    /// Completion times consistent with honest engagement.
    ConsistentTiming,
    /// No reversals over the observation window.
    CleanStreak,
    /// Another user confirmed the engagement happened.
    CommunityConfirmed,
    /// Task reversed after release.
    TaskReversed,
    /// A dispute was raised against the submission.
    DisputeRaised,
    /// Engagement reported faster than plausibly possible.
    UnrealisticSpeed,
    /// Same evidence reused across submissions.
    DuplicateContent,
    /// An abuse report was confirmed by moderation.
    AbuseConfirmed,
}

impl TrustSignal {
    /// Signed score delta. Magnitudes are policy; signs are contract.
    pub fn score_delta(&self) -> i32 {
        match self {
            TrustSignal::TaskVerified => 2,
            TrustSignal::ConsistentTiming => 1,
            TrustSignal::CleanStreak => 3,
            TrustSignal::CommunityConfirmed => 2,
            TrustSignal::TaskReversed => -7,
            TrustSignal::DisputeRaised => -3,
            TrustSignal::UnrealisticSpeed => -5,
            TrustSignal::DuplicateContent => -4,
            TrustSignal::AbuseConfirmed => -10,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TrustSignal::TaskVerified => "Task verified without dispute",
            TrustSignal::ConsistentTiming => "Consistent completion times",
            TrustSignal::CleanStreak => "No reversals over window",
            TrustSignal::CommunityConfirmed => "Community confirmation",
            TrustSignal::TaskReversed => "Task reversed",
            TrustSignal::DisputeRaised => "Dispute raised",
            TrustSignal::UnrealisticSpeed => "Unrealistic speed detected",
            TrustSignal::DuplicateContent => "Duplicate content detected",
            TrustSignal::AbuseConfirmed => "Abuse report confirmed",
        }
    }
}

/// Tunable penalty policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    /// Reversal debit as a multiple of the original credit. Must be
    /// >= 1.0 so attempting-and-hoping is never profitable.
    pub reversal_slash_ratio: f64,

    /// Cooldown imposed when an abuse report is confirmed.
    pub abuse_cooldown_hours: f64,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            reversal_slash_ratio: 1.5,
            abuse_cooldown_hours: 48.0,
        }
    }
}

impl PenaltyPolicy {
    /// Amount to debit when reversing a task that earned `capsules`.
    pub fn slash_amount(&self, capsules: i64) -> i64 {
        (capsules as f64 * self.reversal_slash_ratio).ceil() as i64
    }
}

/// Outcome of a reversal slash.
#[derive(Debug, Clone, Serialize)]
pub struct SlashOutcome {
    pub requested: i64,
    pub debited: i64,
    pub balance_after: i64,
    pub score_after: i32,
}

pub struct PenaltyEngine {
    trust: Arc<TrustManager>,
    ledger: Arc<CapsuleLedger>,
    policy: PenaltyPolicy,
}

impl PenaltyEngine {
    pub fn new(trust: Arc<TrustManager>, ledger: Arc<CapsuleLedger>, policy: PenaltyPolicy) -> Self {
        Self {
            trust,
            ledger,
            policy,
        }
    }

    pub fn policy(&self) -> &PenaltyPolicy {
        &self.policy
    }

    /// Apply a trust signal's score delta; confirmed abuse also imposes a
    /// cooldown. Returns the new score.
    pub async fn apply_signal(&self, user_id: &str, signal: TrustSignal) -> i32 {
        let delta = signal.score_delta();
        let new_score = self.trust.adjust_score(user_id, delta).await;

        info!(
            user_id = %user_id,
            signal = signal.description(),
            delta,
            new_score,
            "Trust signal applied"
        );

        if signal == TrustSignal::AbuseConfirmed {
            self.trust
                .set_cooldown(user_id, self.policy.abuse_cooldown_hours)
                .await;
        }

        new_score
    }

    /// Slash a reversed submission: debit more than was credited (capped
    /// at the current balance so the ledger never goes negative), record
    /// the slashed total, and apply the reversal score delta.
    pub async fn slash_reversal(
        &self,
        user_id: &str,
        submission_id: &str,
        capsules_earned: i64,
    ) -> Result<SlashOutcome, LedgerError> {
        let requested = self.policy.slash_amount(capsules_earned);

        let (debited, balance_after) = self
            .ledger
            .debit_capped(
                user_id,
                requested,
                EntryType::AdminDebit,
                "Reversal slash",
                Some(submission_id.to_string()),
            )
            .await?;

        if debited < requested {
            warn!(
                user_id = %user_id,
                submission_id = %submission_id,
                requested,
                debited,
                "Reversal slash capped at available balance"
            );
        }

        self.trust.record_slashed(user_id, debited).await;
        let score_after = self.apply_signal(user_id, TrustSignal::TaskReversed).await;

        Ok(SlashOutcome {
            requested,
            debited,
            balance_after,
            score_after,
        })
    }

    /// Impose or clear a cooldown directly (moderator action).
    pub async fn impose_cooldown(&self, user_id: &str, hours: f64) {
        self.trust.set_cooldown(user_id, hours).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::tier::TierTable;

    fn engine() -> PenaltyEngine {
        let trust = Arc::new(TrustManager::new(TierTable::default()));
        let ledger = Arc::new(CapsuleLedger::new());
        PenaltyEngine::new(trust, ledger, PenaltyPolicy::default())
    }

    #[test]
    fn test_signal_signs_are_contract() {
        assert!(TrustSignal::TaskVerified.score_delta() > 0);
        assert!(TrustSignal::ConsistentTiming.score_delta() > 0);
        assert!(TrustSignal::CleanStreak.score_delta() > 0);
        assert!(TrustSignal::CommunityConfirmed.score_delta() > 0);
        assert!(TrustSignal::TaskReversed.score_delta() < 0);
        assert!(TrustSignal::DisputeRaised.score_delta() < 0);
        assert!(TrustSignal::UnrealisticSpeed.score_delta() < 0);
        assert!(TrustSignal::DuplicateContent.score_delta() < 0);
        assert!(TrustSignal::AbuseConfirmed.score_delta() < 0);
    }

    #[test]
    fn test_abuse_is_the_heaviest_penalty() {
        let worst = TrustSignal::AbuseConfirmed.score_delta();
        for signal in [
            TrustSignal::TaskReversed,
            TrustSignal::DisputeRaised,
            TrustSignal::UnrealisticSpeed,
            TrustSignal::DuplicateContent,
        ] {
            assert!(worst < signal.score_delta());
        }
    }

    #[test]
    fn test_slash_amount_is_150_percent() {
        let policy = PenaltyPolicy::default();
        assert_eq!(policy.slash_amount(20), 30);
        assert_eq!(policy.slash_amount(5), 8);
    }

    #[tokio::test]
    async fn test_reversal_slash_debits_more_than_earned() {
        let trust = Arc::new(TrustManager::new(TierTable::default()));
        let ledger = Arc::new(CapsuleLedger::new());
        let engine = PenaltyEngine::new(trust.clone(), ledger.clone(), PenaltyPolicy::default());

        ledger
            .credit("user_1", 40, EntryType::Earned, "task rewards", None)
            .await
            .unwrap();

        let outcome = engine.slash_reversal("user_1", "sub_1", 20).await.unwrap();
        assert_eq!(outcome.debited, 30);
        assert_eq!(outcome.balance_after, 10);
        assert_eq!(outcome.score_after, 43); // 50 - 7

        let score = trust.get_score("user_1").await;
        assert_eq!(score.total_capsules_slashed, 30);
    }

    #[tokio::test]
    async fn test_abuse_signal_imposes_cooldown() {
        let trust = Arc::new(TrustManager::new(TierTable::default()));
        let ledger = Arc::new(CapsuleLedger::new());
        let engine = PenaltyEngine::new(trust.clone(), ledger, PenaltyPolicy::default());

        engine.apply_signal("user_1", TrustSignal::AbuseConfirmed).await;
        assert!(trust.is_on_cooldown("user_1").await);
    }

    #[tokio::test]
    async fn test_positive_signal_never_triggers_cooldown() {
        let e = engine();
        let score = e.apply_signal("user_1", TrustSignal::CleanStreak).await;
        assert_eq!(score, 53);
    }
}
