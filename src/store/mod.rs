use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{Quest, QuestProgress};

mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgStore;

/// Read/write access to quest definitions. Writes happen only on the admin
/// edit path; the completion workflow reads.
#[async_trait]
pub trait QuestStore: Send + Sync {
    async fn find_quest(&self, quest_id: i64) -> Result<Option<Quest>>;
    async fn list_quests(&self) -> Result<Vec<Quest>>;
    /// Inserts a new quest; the id on the argument is ignored and the stored
    /// quest with its assigned id is returned.
    async fn insert_quest(&self, quest: &Quest) -> Result<Quest>;
    async fn update_quest(&self, quest: &Quest) -> Result<Quest>;
}

/// Per-(user, quest) progress records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find_progress(&self, user_id: &str, quest_id: i64) -> Result<Option<QuestProgress>>;
    /// All progress records for one user, fetched in a single query so
    /// listing endpoints avoid a round trip per quest.
    async fn list_user_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>>;
    /// Plain write for non-completing transitions (submit, reject).
    async fn upsert_progress(&self, progress: &QuestProgress) -> Result<()>;
    /// Persists a completing transition and credits `points` to the user's
    /// ledger balance as one atomic unit: either both writes commit or
    /// neither is observable. The ledger credit lives here rather than on a
    /// separate collaborator because the two writes must share a transaction.
    async fn complete_and_award(&self, progress: &QuestProgress, points: i64) -> Result<()>;
}

/// Restricted read of a user's completed-quest set, for prerequisite checks.
#[async_trait]
pub trait PrerequisiteLookup: Send + Sync {
    async fn completed_quest_ids(&self, user_id: &str, candidates: &[i64]) -> Result<Vec<i64>>;
}

/// Read side of the user point ledger. Credits go through
/// [`ProgressStore::complete_and_award`].
#[async_trait]
pub trait UserLedger: Send + Sync {
    async fn balance(&self, user_id: &str) -> Result<i64>;
}

/// Everything the completion workflow needs from persistence.
pub trait Store: QuestStore + ProgressStore + PrerequisiteLookup {}

impl<T: QuestStore + ProgressStore + PrerequisiteLookup> Store for T {}
