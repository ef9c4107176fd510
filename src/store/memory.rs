//! In-memory store used by the engine tests. Mirrors the atomicity contract
//! of the Postgres implementation: `complete_and_award` applies the progress
//! write and the ledger credit together or not at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{AppError, Result};
use crate::models::{ProgressStatus, Quest, QuestProgress};

use super::{PrerequisiteLookup, ProgressStore, QuestStore, UserLedger};

#[derive(Default)]
pub struct MemoryStore {
    quests: Mutex<HashMap<i64, Quest>>,
    next_quest_id: AtomicI64,
    progress: Mutex<HashMap<(String, i64), QuestProgress>>,
    balances: Mutex<HashMap<String, i64>>,
    fail_next_award: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            next_quest_id: AtomicI64::new(1),
            ..MemoryStore::default()
        }
    }

    pub fn with_quests(quests: impl IntoIterator<Item = Quest>) -> Self {
        let store = MemoryStore::new();
        {
            let mut map = store.quests.lock().unwrap();
            for quest in quests {
                store
                    .next_quest_id
                    .fetch_max(quest.id + 1, Ordering::SeqCst);
                map.insert(quest.id, quest);
            }
        }
        store
    }

    /// Makes the next `complete_and_award` fail, for atomicity tests.
    pub fn fail_next_award(&self) {
        self.fail_next_award.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestStore for MemoryStore {
    async fn find_quest(&self, quest_id: i64) -> Result<Option<Quest>> {
        Ok(self.quests.lock().unwrap().get(&quest_id).cloned())
    }

    async fn list_quests(&self) -> Result<Vec<Quest>> {
        let mut quests: Vec<Quest> = self.quests.lock().unwrap().values().cloned().collect();
        quests.sort_by_key(|q| q.id);
        Ok(quests)
    }

    async fn insert_quest(&self, quest: &Quest) -> Result<Quest> {
        let mut stored = quest.clone();
        stored.id = self.next_quest_id.fetch_add(1, Ordering::SeqCst);
        self.quests.lock().unwrap().insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_quest(&self, quest: &Quest) -> Result<Quest> {
        let mut quests = self.quests.lock().unwrap();
        if !quests.contains_key(&quest.id) {
            return Err(AppError::NotFound(format!("quest {}", quest.id)));
        }
        quests.insert(quest.id, quest.clone());
        Ok(quest.clone())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn find_progress(&self, user_id: &str, quest_id: i64) -> Result<Option<QuestProgress>> {
        Ok(self
            .progress
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), quest_id))
            .cloned())
    }

    async fn list_user_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>> {
        let mut records: Vec<QuestProgress> = self
            .progress
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|p| p.quest_id);
        Ok(records)
    }

    async fn upsert_progress(&self, progress: &QuestProgress) -> Result<()> {
        self.progress
            .lock()
            .unwrap()
            .insert((progress.user_id.clone(), progress.quest_id), progress.clone());
        Ok(())
    }

    async fn complete_and_award(&self, progress: &QuestProgress, points: i64) -> Result<()> {
        if self.fail_next_award.swap(false, Ordering::SeqCst) {
            return Err(AppError::DatabaseError("injected award failure".to_string()));
        }

        // Both maps are updated under the progress lock so the pair is
        // observed together, like the Postgres transaction.
        let mut records = self.progress.lock().unwrap();
        records.insert((progress.user_id.clone(), progress.quest_id), progress.clone());
        *self
            .balances
            .lock()
            .unwrap()
            .entry(progress.user_id.clone())
            .or_insert(0) += points;
        Ok(())
    }
}

#[async_trait]
impl PrerequisiteLookup for MemoryStore {
    async fn completed_quest_ids(&self, user_id: &str, candidates: &[i64]) -> Result<Vec<i64>> {
        let records = self.progress.lock().unwrap();
        Ok(candidates
            .iter()
            .copied()
            .filter(|quest_id| {
                records
                    .get(&(user_id.to_string(), *quest_id))
                    .map(|p| p.status == ProgressStatus::Completed)
                    .unwrap_or(false)
            })
            .collect())
    }
}

#[async_trait]
impl UserLedger for MemoryStore {
    async fn balance(&self, user_id: &str) -> Result<i64> {
        Ok(*self.balances.lock().unwrap().get(user_id).unwrap_or(&0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn list_user_progress_returns_only_that_users_records() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for quest_id in [3, 1, 2] {
            store
                .upsert_progress(&QuestProgress::new_submission("alice", quest_id, json!({}), now))
                .await
                .unwrap();
        }
        store
            .upsert_progress(&QuestProgress::new_submission("bob", 1, json!({}), now))
            .await
            .unwrap();

        let records = store.list_user_progress("alice").await.unwrap();
        let quest_ids: Vec<i64> = records.iter().map(|p| p.quest_id).collect();
        assert_eq!(quest_ids, vec![1, 2, 3]);
        assert!(records.iter().all(|p| p.user_id == "alice"));

        assert!(store.list_user_progress("carol").await.unwrap().is_empty());
    }
}
