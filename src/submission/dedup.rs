//! Duplicate Evidence Detection
//!
//! Tracks evidence hashes across submissions to catch recycled comments
//! and answers while avoiding false positives.
//!
//! | Pattern | Interpretation | Action |
//! |---------|----------------|--------|
//! | Same submission + same hash | Retry of the same submit | Allow |
//! | Same user + different task + same hash | Evidence recycling | Flag for review |
//! | Different user + same task + same hash | Possible collusion | Flag for review |
//!
//! Flags never slash directly; a moderator confirms before the duplicate
//! content penalty is applied.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub submission_id: Uuid,
    pub task_id: String,
    pub user_id: String,
    pub evidence_hash: String,
    pub submitted_at: DateTime<Utc>,
}

/// Flags raised while recording evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateFlag {
    /// Same user reused evidence on a different task.
    CrossTaskDuplicate { other_task: String },
    /// Different user submitted identical evidence for the same task.
    PossibleCollusion { other_user: String, task_id: String },
}

/// Outcome of recording one submission's evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceCheck {
    Clean,
    /// Same submission re-submitted identical evidence (retry).
    Resubmission,
    Flagged(Vec<DuplicateFlag>),
}

/// Evidence tracking and duplicate detection.
#[derive(Debug, Default)]
pub struct EvidenceTracker {
    records: HashMap<Uuid, EvidenceRecord>,

    /// evidence_hash -> submissions carrying it
    hash_index: HashMap<String, Vec<Uuid>>,
}

impl EvidenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash the textual evidence of a submission for deduplication.
    pub fn compute_evidence_hash(
        task_type: &str,
        comment_text: Option<&str>,
        content_answer: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(task_type.as_bytes());
        if let Some(comment) = comment_text {
            hasher.update(comment.trim().to_lowercase().as_bytes());
        }
        hasher.update(content_answer.trim().to_lowercase().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Record a submission's evidence and report duplicates.
    pub fn record(
        &mut self,
        submission_id: Uuid,
        task_id: &str,
        user_id: &str,
        evidence_hash: String,
    ) -> EvidenceCheck {
        if let Some(existing) = self.records.get(&submission_id) {
            if existing.evidence_hash == evidence_hash {
                debug!(submission_id = %submission_id, "Identical evidence re-submitted (retry)");
                return EvidenceCheck::Resubmission;
            }
        }

        let mut flags = Vec::new();
        if let Some(other_ids) = self.hash_index.get(&evidence_hash) {
            for other_id in other_ids {
                if *other_id == submission_id {
                    continue;
                }
                if let Some(other) = self.records.get(other_id) {
                    if other.user_id != user_id && other.task_id == task_id {
                        flags.push(DuplicateFlag::PossibleCollusion {
                            other_user: other.user_id.clone(),
                            task_id: task_id.to_string(),
                        });
                    } else if other.user_id == user_id && other.task_id != task_id {
                        flags.push(DuplicateFlag::CrossTaskDuplicate {
                            other_task: other.task_id.clone(),
                        });
                    }
                }
            }
        }

        let record = EvidenceRecord {
            submission_id,
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            evidence_hash: evidence_hash.clone(),
            submitted_at: Utc::now(),
        };
        self.records.insert(submission_id, record);
        self.hash_index
            .entry(evidence_hash)
            .or_default()
            .push(submission_id);

        if flags.is_empty() {
            EvidenceCheck::Clean
        } else {
            info!(
                user_id = %user_id,
                task_id = %task_id,
                flags = ?flags,
                "Duplicate evidence flagged for review"
            );
            EvidenceCheck::Flagged(flags)
        }
    }

    /// Drop records older than `max_age_days`. Returns the count removed.
    pub fn cleanup_old_records(&mut self, max_age_days: u64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::days(max_age_days as i64);

        let to_remove: Vec<Uuid> = self
            .records
            .iter()
            .filter(|(_, r)| r.submitted_at < cutoff)
            .map(|(id, _)| *id)
            .collect();

        for id in &to_remove {
            if let Some(record) = self.records.remove(id) {
                if let Some(ids) = self.hash_index.get_mut(&record.evidence_hash) {
                    ids.retain(|i| i != id);
                }
            }
        }

        to_remove.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(comment: Option<&str>, answer: &str) -> String {
        EvidenceTracker::compute_evidence_hash("comment", comment, answer)
    }

    #[test]
    fn test_hash_is_stable_and_case_insensitive() {
        assert_eq!(
            hash(Some("Great post!"), "blue"),
            hash(Some("great post! "), "Blue")
        );
        assert_ne!(hash(Some("great post!"), "blue"), hash(None, "blue"));
    }

    #[test]
    fn test_clean_then_retry() {
        let mut tracker = EvidenceTracker::new();
        let id = Uuid::new_v4();
        let h = hash(Some("great post!"), "blue");

        assert_eq!(
            tracker.record(id, "task_1", "user_a", h.clone()),
            EvidenceCheck::Clean
        );
        assert_eq!(
            tracker.record(id, "task_1", "user_a", h),
            EvidenceCheck::Resubmission
        );
    }

    #[test]
    fn test_cross_user_same_task_flags_collusion() {
        let mut tracker = EvidenceTracker::new();
        let h = hash(Some("great post!"), "blue");

        tracker.record(Uuid::new_v4(), "task_1", "user_a", h.clone());
        let check = tracker.record(Uuid::new_v4(), "task_1", "user_b", h);

        match check {
            EvidenceCheck::Flagged(flags) => assert!(matches!(
                flags[0],
                DuplicateFlag::PossibleCollusion { .. }
            )),
            other => panic!("expected flag, got {:?}", other),
        }
    }

    #[test]
    fn test_same_user_cross_task_flags_recycling() {
        let mut tracker = EvidenceTracker::new();
        let h = hash(Some("great post!"), "blue");

        tracker.record(Uuid::new_v4(), "task_1", "user_a", h.clone());
        let check = tracker.record(Uuid::new_v4(), "task_2", "user_a", h);

        match check {
            EvidenceCheck::Flagged(flags) => assert!(matches!(
                flags[0],
                DuplicateFlag::CrossTaskDuplicate { .. }
            )),
            other => panic!("expected flag, got {:?}", other),
        }
    }

    #[test]
    fn test_distinct_evidence_stays_clean() {
        let mut tracker = EvidenceTracker::new();
        tracker.record(
            Uuid::new_v4(),
            "task_1",
            "user_a",
            hash(Some("great post!"), "blue"),
        );
        let check = tracker.record(
            Uuid::new_v4(),
            "task_1",
            "user_b",
            hash(Some("love this"), "red"),
        );
        assert_eq!(check, EvidenceCheck::Clean);
    }
}
