use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-(user, quest) progress status. `Pending` and `InProgress` are part of
/// the stored domain but no current transition produces them; they are kept
/// for a possible future explicit claim step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    InProgress,
    Submitted,
    Completed,
    Rejected,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Pending => "pending",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Submitted => "submitted",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<ProgressStatus> {
        match s {
            "pending" => Some(ProgressStatus::Pending),
            "in_progress" => Some(ProgressStatus::InProgress),
            "submitted" => Some(ProgressStatus::Submitted),
            "completed" => Some(ProgressStatus::Completed),
            "rejected" => Some(ProgressStatus::Rejected),
            _ => None,
        }
    }
}

/// One record per (user, quest) pair, created lazily on first submission.
///
/// `points_earned` equals the sum of points awarded over all completion
/// events, and `completion_count` moves by exactly one per completion;
/// both are written together with the ledger credit as one atomic unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestProgress {
    pub user_id: String,
    pub quest_id: i64,
    pub status: ProgressStatus,
    pub submission_data: serde_json::Value,
    pub completion_count: i32,
    pub points_earned: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl QuestProgress {
    /// Fresh record for a first submission.
    pub fn new_submission(
        user_id: &str,
        quest_id: i64,
        submission_data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        QuestProgress {
            user_id: user_id.to_string(),
            quest_id,
            status: ProgressStatus::Submitted,
            submission_data,
            completion_count: 0,
            points_earned: 0,
            started_at: now,
            completed_at: None,
            rejection_reason: None,
        }
    }

    /// Re-submission on an existing record: replaces the proof, returns the
    /// record to `Submitted`, clears any previous rejection, and keeps
    /// `started_at` plus the completion counters.
    pub fn resubmit(&mut self, submission_data: serde_json::Value) {
        self.submission_data = submission_data;
        self.status = ProgressStatus::Submitted;
        self.rejection_reason = None;
    }
}
