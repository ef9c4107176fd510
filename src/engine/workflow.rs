use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::engine::availability::{check_available, check_repeatable};
use crate::engine::prerequisites::missing_prerequisites;
use crate::errors::{AppError, Result};
use crate::models::{ProgressStatus, Quest, QuestProgress};
use crate::store::Store;
use crate::validation::{reward_points, validate_submission};

const DEFAULT_REJECTION_REASON: &str = "submission did not meet the quest requirements";

/// Drives the submit -> verify -> award lifecycle.
///
/// Calls touching the same (user, quest) pair are serialized through a
/// per-key lock so racing submissions cannot double-credit points or step
/// past a completion bound; pairs that differ proceed in parallel. The
/// completing write itself goes through `Store::complete_and_award`, which
/// applies the progress counters and the ledger credit as one atomic unit.
pub struct QuestWorkflow<S> {
    store: Arc<S>,
    locks: DashMap<(String, i64), Arc<Mutex<()>>>,
}

impl<S: Store> QuestWorkflow<S> {
    pub fn new(store: Arc<S>) -> Self {
        QuestWorkflow { store, locks: DashMap::new() }
    }

    fn lock_for(&self, user_id: &str, quest_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry((user_id.to_string(), quest_id))
            .or_default()
            .clone()
    }

    /// Drops the lock entry for a pair once no task holds or awaits it, so
    /// the map stays proportional to in-flight requests rather than to every
    /// (user, quest) pair ever touched. A strong count above one means some
    /// other task cloned the Arc and the entry must stay.
    fn release_lock(&self, user_id: &str, quest_id: i64) {
        self.locks
            .remove_if(&(user_id.to_string(), quest_id), |_, lock| {
                Arc::strong_count(lock) == 1
            });
    }

    /// Records a submission, creating the progress record on first contact.
    /// When the quest is configured to auto-verify, the same call completes
    /// it and credits the reward.
    pub async fn submit(
        &self,
        user_id: &str,
        quest_id: i64,
        submission_data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress> {
        let lock = self.lock_for(user_id, quest_id);
        let result = {
            let _guard = lock.lock().await;
            self.submit_locked(user_id, quest_id, submission_data, now).await
        };
        drop(lock);
        self.release_lock(user_id, quest_id);
        result
    }

    async fn submit_locked(
        &self,
        user_id: &str,
        quest_id: i64,
        submission_data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress> {
        let quest = self
            .store
            .find_quest(quest_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("quest {}", quest_id)))?;

        check_available(&quest, now).map_err(AppError::Ineligible)?;

        let existing = self.store.find_progress(user_id, quest_id).await?;
        let completions = existing.as_ref().map(|p| p.completion_count).unwrap_or(0);
        check_repeatable(&quest, completions).map_err(AppError::Ineligible)?;

        self.check_prerequisites(&quest, user_id).await?;

        validate_submission(&quest, &submission_data).map_err(AppError::InvalidSubmission)?;

        let mut progress = match existing {
            Some(mut p) => {
                p.resubmit(submission_data);
                p
            }
            None => QuestProgress::new_submission(user_id, quest_id, submission_data, now),
        };

        if quest.verification.auto_verify {
            self.complete(&quest, &mut progress, now).await?;
        } else {
            self.store.upsert_progress(&progress).await?;
        }

        Ok(progress)
    }

    /// Manual review of a submitted record. Approval applies the same
    /// completion effects as the auto-verify path; rejection records the
    /// reason and leaves the completion counters untouched, so a rejected
    /// attempt never consumes a repeat allowance.
    pub async fn verify(
        &self,
        user_id: &str,
        quest_id: i64,
        approved: bool,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress> {
        let lock = self.lock_for(user_id, quest_id);
        let result = {
            let _guard = lock.lock().await;
            self.verify_locked(user_id, quest_id, approved, reason, now).await
        };
        drop(lock);
        self.release_lock(user_id, quest_id);
        result
    }

    async fn verify_locked(
        &self,
        user_id: &str,
        quest_id: i64,
        approved: bool,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<QuestProgress> {
        let quest = self
            .store
            .find_quest(quest_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("quest {}", quest_id)))?;

        let mut progress = self
            .store
            .find_progress(user_id, quest_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("progress for user {} on quest {}", user_id, quest_id))
            })?;

        if progress.status != ProgressStatus::Submitted {
            return Err(AppError::Ineligible(format!(
                "cannot verify a {} record, a pending submission is required",
                progress.status.as_str()
            )));
        }

        if approved {
            check_repeatable(&quest, progress.completion_count).map_err(AppError::Ineligible)?;
            self.complete(&quest, &mut progress, now).await?;
        } else {
            progress.status = ProgressStatus::Rejected;
            progress.rejection_reason =
                Some(reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()));
            self.store.upsert_progress(&progress).await?;
        }

        Ok(progress)
    }

    async fn check_prerequisites(&self, quest: &Quest, user_id: &str) -> Result<()> {
        if quest.prerequisite_quest_ids.is_empty() {
            return Ok(());
        }
        let completed: HashSet<i64> = self
            .store
            .completed_quest_ids(user_id, &quest.prerequisite_quest_ids)
            .await?
            .into_iter()
            .collect();
        let check = missing_prerequisites(&quest.prerequisite_quest_ids, &completed);
        if !check.valid {
            return Err(AppError::PrerequisiteUnmet(check.missing_quest_ids));
        }
        Ok(())
    }

    /// The single completion path, shared by auto-verify and manual approval.
    /// If the store call fails the mutated record is dropped with the error,
    /// so no partial transition is ever observable.
    async fn complete(
        &self,
        quest: &Quest,
        progress: &mut QuestProgress,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let points = reward_points(quest.reward_points, quest.reward_multiplier);
        progress.status = ProgressStatus::Completed;
        progress.completion_count += 1;
        progress.completed_at = Some(now);
        progress.points_earned += points;
        progress.rejection_reason = None;
        self.store.complete_and_award(progress, points).await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::models::{ProofType, QuestStatus, QuestType, VerificationConfig};
    use crate::store::memory::MemoryStore;
    use crate::store::{ProgressStore, UserLedger};

    fn quest(id: i64) -> Quest {
        Quest {
            id,
            title: format!("quest {}", id),
            description: String::new(),
            quest_type: QuestType::DailyCheckin,
            reward_points: 10,
            status: QuestStatus::Active,
            config: json!({}),
            verification: VerificationConfig {
                proof_required: false,
                proof_type: ProofType::Text,
                auto_verify: true,
            },
            is_repeatable: false,
            max_completions: None,
            start_date: None,
            end_date: None,
            prerequisite_quest_ids: vec![],
            reward_multiplier: Decimal::ONE,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn manual(mut q: Quest) -> Quest {
        q.verification.auto_verify = false;
        q
    }

    fn workflow(quests: Vec<Quest>) -> (Arc<MemoryStore>, QuestWorkflow<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_quests(quests));
        let workflow = QuestWorkflow::new(store.clone());
        (store, workflow)
    }

    #[tokio::test]
    async fn auto_verify_completes_and_credits_in_one_call() {
        let (store, wf) = workflow(vec![quest(1)]);
        let now = Utc::now();

        let progress = wf.submit("alice", 1, json!({}), now).await.unwrap();
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(progress.completion_count, 1);
        assert_eq!(progress.points_earned, 10);
        assert_eq!(progress.completed_at, Some(now));
        assert_eq!(store.balance("alice").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn submitting_an_unknown_quest_is_not_found() {
        let (_, wf) = workflow(vec![]);
        let err = wf.submit("alice", 99, json!({}), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn completed_non_repeatable_quest_rejects_further_submits() {
        let (store, wf) = workflow(vec![quest(1)]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({}), now).await.unwrap();
        let err = wf.submit("alice", 1, json!({}), now).await.unwrap_err();
        assert!(matches!(err, AppError::Ineligible(_)));

        // Neither counters nor balance moved on the failed attempt.
        let progress = store.find_progress("alice", 1).await.unwrap().unwrap();
        assert_eq!(progress.completion_count, 1);
        assert_eq!(progress.points_earned, 10);
        assert_eq!(store.balance("alice").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn max_completions_bound_is_enforced() {
        let mut q = quest(1);
        q.is_repeatable = true;
        q.max_completions = Some(2);
        let (store, wf) = workflow(vec![q]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({}), now).await.unwrap();
        let second = wf.submit("alice", 1, json!({}), now).await.unwrap();
        assert_eq!(second.completion_count, 2);

        let err = wf.submit("alice", 1, json!({}), now).await.unwrap_err();
        assert!(matches!(err, AppError::Ineligible(_)));
        assert_eq!(store.balance("alice").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn out_of_window_quests_reject_the_request() {
        let mut q = quest(1);
        q.end_date = Some(Utc::now() - chrono::Duration::hours(1));
        let (store, wf) = workflow(vec![q]);

        let err = wf.submit("alice", 1, json!({}), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Ineligible(_)));
        assert!(store.find_progress("alice", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unmet_prerequisites_name_the_missing_quests() {
        let mut gated = quest(4);
        gated.prerequisite_quest_ids = vec![1, 2, 3];
        let (_store, wf) = workflow(vec![quest(1), quest(2), quest(3), gated]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({}), now).await.unwrap();
        wf.submit("alice", 3, json!({}), now).await.unwrap();

        let err = wf.submit("alice", 4, json!({}), now).await.unwrap_err();
        match err {
            AppError::PrerequisiteUnmet(missing) => assert_eq!(missing, vec![2]),
            other => panic!("expected PrerequisiteUnmet, got {:?}", other),
        }

        wf.submit("alice", 2, json!({}), now).await.unwrap();
        assert!(wf.submit("alice", 4, json!({}), now).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_submissions_write_nothing() {
        let mut q = manual(quest(1));
        q.verification.proof_required = true;
        q.verification.proof_type = ProofType::Url;
        let (store, wf) = workflow(vec![q]);

        let err = wf
            .submit("alice", 1, json!({ "url": "not a url" }), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSubmission(_)));
        assert!(store.find_progress("alice", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn manual_flow_waits_for_approval() {
        let (store, wf) = workflow(vec![manual(quest(1))]);
        let now = Utc::now();

        let submitted = wf.submit("alice", 1, json!({ "note": "done" }), now).await.unwrap();
        assert_eq!(submitted.status, ProgressStatus::Submitted);
        assert_eq!(submitted.points_earned, 0);
        assert_eq!(store.balance("alice").await.unwrap(), 0);

        let approved = wf.verify("alice", 1, true, None, now).await.unwrap();
        assert_eq!(approved.status, ProgressStatus::Completed);
        assert_eq!(approved.completion_count, 1);
        assert_eq!(store.balance("alice").await.unwrap(), 10);

        // A completed record cannot be verified again.
        let err = wf.verify("alice", 1, true, None, now).await.unwrap_err();
        assert!(matches!(err, AppError::Ineligible(_)));
    }

    #[tokio::test]
    async fn verify_without_a_submission_is_not_found() {
        let (_, wf) = workflow(vec![manual(quest(1))]);
        let err = wf.verify("alice", 1, true, None, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejection_records_a_reason_and_costs_nothing() {
        let (store, wf) = workflow(vec![manual(quest(1))]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({}), now).await.unwrap();
        let rejected = wf
            .verify("alice", 1, false, Some("blurry screenshot".to_string()), now)
            .await
            .unwrap();
        assert_eq!(rejected.status, ProgressStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("blurry screenshot"));
        assert_eq!(rejected.completion_count, 0);
        assert_eq!(store.balance("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejection_without_a_reason_gets_the_default_text() {
        let (_, wf) = workflow(vec![manual(quest(1))]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({}), now).await.unwrap();
        let rejected = wf.verify("alice", 1, false, None, now).await.unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some(DEFAULT_REJECTION_REASON));
    }

    #[tokio::test]
    async fn reject_then_resubmit_then_approve_on_a_non_repeatable_quest() {
        let (store, wf) = workflow(vec![manual(quest(1))]);
        let started = Utc::now();

        wf.submit("alice", 1, json!({ "attempt": 1 }), started).await.unwrap();
        wf.verify("alice", 1, false, None, started).await.unwrap();

        // Rejection never consumed the single allowed completion.
        let later = started + chrono::Duration::minutes(5);
        let resubmitted = wf.submit("alice", 1, json!({ "attempt": 2 }), later).await.unwrap();
        assert_eq!(resubmitted.status, ProgressStatus::Submitted);
        assert_eq!(resubmitted.started_at, started);
        assert!(resubmitted.rejection_reason.is_none());

        let approved = wf.verify("alice", 1, true, None, later).await.unwrap();
        assert_eq!(approved.completion_count, 1);
        assert_eq!(approved.points_earned, 10);
        assert_eq!(store.balance("alice").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn reward_multiplier_is_floored_at_award_time() {
        let mut q = quest(1);
        q.reward_points = 50;
        q.reward_multiplier = Decimal::from_str("1.5").unwrap();
        let (store, wf) = workflow(vec![q]);

        let progress = wf.submit("alice", 1, json!({}), Utc::now()).await.unwrap();
        assert_eq!(progress.points_earned, 75);
        assert_eq!(store.balance("alice").await.unwrap(), 75);
    }

    #[tokio::test]
    async fn racing_submits_award_exactly_once() {
        let (store, wf) = workflow(vec![quest(1)]);
        let wf = Arc::new(wf);
        let now = Utc::now();

        let a = {
            let wf = wf.clone();
            tokio::spawn(async move { wf.submit("alice", 1, json!({}), now).await })
        };
        let b = {
            let wf = wf.clone();
            tokio::spawn(async move { wf.submit("alice", 1, json!({}), now).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let completed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(completed, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Ineligible(_)))));

        let progress = store.find_progress("alice", 1).await.unwrap().unwrap();
        assert_eq!(progress.completion_count, 1);
        assert_eq!(store.balance("alice").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn failed_award_leaves_no_observable_state() {
        let (store, wf) = workflow(vec![quest(1)]);
        store.fail_next_award();

        let err = wf.submit("alice", 1, json!({}), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert!(store.find_progress("alice", 1).await.unwrap().is_none());
        assert_eq!(store.balance("alice").await.unwrap(), 0);

        // The failure was transient; the retry succeeds cleanly.
        let progress = wf.submit("alice", 1, json!({}), Utc::now()).await.unwrap();
        assert_eq!(progress.completion_count, 1);
        assert_eq!(store.balance("alice").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn lock_entries_do_not_accumulate_across_calls() {
        let (_store, wf) = workflow(vec![manual(quest(1)), quest(2)]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({}), now).await.unwrap();
        wf.verify("alice", 1, true, None, now).await.unwrap();
        wf.submit("bob", 2, json!({}), now).await.unwrap();
        let _ = wf.submit("carol", 99, json!({}), now).await;

        // Every pair, including the failed call, released its entry.
        assert!(wf.locks.is_empty());
    }

    #[tokio::test]
    async fn racing_calls_still_release_their_lock_entry() {
        let (_store, wf) = workflow(vec![quest(1)]);
        let wf = Arc::new(wf);
        let now = Utc::now();

        let a = {
            let wf = wf.clone();
            tokio::spawn(async move { wf.submit("alice", 1, json!({}), now).await })
        };
        let b = {
            let wf = wf.clone();
            tokio::spawn(async move { wf.submit("alice", 1, json!({}), now).await })
        };
        let _ = a.await.unwrap();
        let _ = b.await.unwrap();

        assert!(wf.locks.is_empty());
    }

    #[tokio::test]
    async fn resubmission_replaces_the_submission_data() {
        let (store, wf) = workflow(vec![manual(quest(1))]);
        let now = Utc::now();

        wf.submit("alice", 1, json!({ "text": "first" }), now).await.unwrap();
        wf.submit("alice", 1, json!({ "text": "second" }), now).await.unwrap();

        let progress = store.find_progress("alice", 1).await.unwrap().unwrap();
        assert_eq!(progress.submission_data, json!({ "text": "second" }));
        assert_eq!(progress.status, ProgressStatus::Submitted);
    }
}
