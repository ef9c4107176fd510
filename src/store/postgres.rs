use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::errors::{AppError, Result};
use crate::models::{ProgressStatus, Quest, QuestProgress, QuestStatus, QuestType};

use super::{PrerequisiteLookup, ProgressStore, QuestStore, UserLedger};

/// sqlx-backed store. Enum-ish columns are stored as text and JSON payloads
/// as JSONB; rows are mapped to the domain types at this boundary so nothing
/// above it sees raw strings.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

const QUEST_COLUMNS: &str = "id, title, description, quest_type, reward_points, status, config, \
     verification, is_repeatable, max_completions, start_date, end_date, \
     prerequisite_quest_ids, reward_multiplier, created_at, updated_at";

const PROGRESS_COLUMNS: &str = "user_id, quest_id, status, submission_data, completion_count, \
     points_earned, started_at, completed_at, rejection_reason";

#[derive(FromRow)]
struct QuestRow {
    id: i64,
    title: String,
    description: String,
    quest_type: String,
    reward_points: i64,
    status: String,
    config: serde_json::Value,
    verification: serde_json::Value,
    is_repeatable: bool,
    max_completions: Option<i32>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    prerequisite_quest_ids: Vec<i64>,
    reward_multiplier: Decimal,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuestRow> for Quest {
    type Error = AppError;

    fn try_from(row: QuestRow) -> Result<Quest> {
        let status = QuestStatus::parse(&row.status).ok_or_else(|| {
            AppError::DatabaseError(format!("unknown quest status `{}`", row.status))
        })?;
        let verification = serde_json::from_value(row.verification).map_err(|e| {
            AppError::DatabaseError(format!("malformed verification config: {}", e))
        })?;
        Ok(Quest {
            id: row.id,
            title: row.title,
            description: row.description,
            quest_type: QuestType::parse(&row.quest_type),
            reward_points: row.reward_points,
            status,
            config: row.config,
            verification,
            is_repeatable: row.is_repeatable,
            max_completions: row.max_completions,
            start_date: row.start_date,
            end_date: row.end_date,
            prerequisite_quest_ids: row.prerequisite_quest_ids,
            reward_multiplier: row.reward_multiplier,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ProgressRow {
    user_id: String,
    quest_id: i64,
    status: String,
    submission_data: serde_json::Value,
    completion_count: i32,
    points_earned: i64,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

impl TryFrom<ProgressRow> for QuestProgress {
    type Error = AppError;

    fn try_from(row: ProgressRow) -> Result<QuestProgress> {
        let status = ProgressStatus::parse(&row.status).ok_or_else(|| {
            AppError::DatabaseError(format!("unknown progress status `{}`", row.status))
        })?;
        Ok(QuestProgress {
            user_id: row.user_id,
            quest_id: row.quest_id,
            status,
            submission_data: row.submission_data,
            completion_count: row.completion_count,
            points_earned: row.points_earned,
            started_at: row.started_at,
            completed_at: row.completed_at,
            rejection_reason: row.rejection_reason,
        })
    }
}

fn verification_json(quest: &Quest) -> Result<serde_json::Value> {
    serde_json::to_value(quest.verification)
        .map_err(|e| AppError::DatabaseError(format!("failed to encode verification: {}", e)))
}

#[async_trait]
impl QuestStore for PgStore {
    async fn find_quest(&self, quest_id: i64) -> Result<Option<Quest>> {
        let row = sqlx::query_as::<_, QuestRow>(&format!(
            "SELECT {} FROM quests WHERE id = $1",
            QUEST_COLUMNS
        ))
        .bind(quest_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Quest::try_from).transpose()
    }

    async fn list_quests(&self) -> Result<Vec<Quest>> {
        let rows = sqlx::query_as::<_, QuestRow>(&format!(
            "SELECT {} FROM quests ORDER BY id",
            QUEST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Quest::try_from).collect()
    }

    async fn insert_quest(&self, quest: &Quest) -> Result<Quest> {
        let row = sqlx::query_as::<_, QuestRow>(&format!(
            r#"
            INSERT INTO quests (title, description, quest_type, reward_points, status, config,
                verification, is_repeatable, max_completions, start_date, end_date,
                prerequisite_quest_ids, reward_multiplier)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            QUEST_COLUMNS
        ))
        .bind(&quest.title)
        .bind(&quest.description)
        .bind(quest.quest_type.as_str())
        .bind(quest.reward_points)
        .bind(quest.status.as_str())
        .bind(&quest.config)
        .bind(verification_json(quest)?)
        .bind(quest.is_repeatable)
        .bind(quest.max_completions)
        .bind(quest.start_date)
        .bind(quest.end_date)
        .bind(&quest.prerequisite_quest_ids)
        .bind(quest.reward_multiplier)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert quest: {}", e);
            AppError::DatabaseError("Failed to create quest".to_string())
        })?;

        Quest::try_from(row)
    }

    async fn update_quest(&self, quest: &Quest) -> Result<Quest> {
        let row = sqlx::query_as::<_, QuestRow>(&format!(
            r#"
            UPDATE quests
            SET title = $1, description = $2, quest_type = $3, reward_points = $4, status = $5,
                config = $6, verification = $7, is_repeatable = $8, max_completions = $9,
                start_date = $10, end_date = $11, prerequisite_quest_ids = $12,
                reward_multiplier = $13, updated_at = CURRENT_TIMESTAMP
            WHERE id = $14
            RETURNING {}
            "#,
            QUEST_COLUMNS
        ))
        .bind(&quest.title)
        .bind(&quest.description)
        .bind(quest.quest_type.as_str())
        .bind(quest.reward_points)
        .bind(quest.status.as_str())
        .bind(&quest.config)
        .bind(verification_json(quest)?)
        .bind(quest.is_repeatable)
        .bind(quest.max_completions)
        .bind(quest.start_date)
        .bind(quest.end_date)
        .bind(&quest.prerequisite_quest_ids)
        .bind(quest.reward_multiplier)
        .bind(quest.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("quest {}", quest.id)))?;

        Quest::try_from(row)
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn find_progress(&self, user_id: &str, quest_id: i64) -> Result<Option<QuestProgress>> {
        let row = sqlx::query_as::<_, ProgressRow>(&format!(
            "SELECT {} FROM quest_progress WHERE user_id = $1 AND quest_id = $2",
            PROGRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(quest_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuestProgress::try_from).transpose()
    }

    async fn list_user_progress(&self, user_id: &str) -> Result<Vec<QuestProgress>> {
        let rows = sqlx::query_as::<_, ProgressRow>(&format!(
            "SELECT {} FROM quest_progress WHERE user_id = $1",
            PROGRESS_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuestProgress::try_from).collect()
    }

    async fn upsert_progress(&self, progress: &QuestProgress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quest_progress (user_id, quest_id, status, submission_data,
                completion_count, points_earned, started_at, completed_at, rejection_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, quest_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                submission_data = EXCLUDED.submission_data,
                completion_count = EXCLUDED.completion_count,
                points_earned = EXCLUDED.points_earned,
                completed_at = EXCLUDED.completed_at,
                rejection_reason = EXCLUDED.rejection_reason
            "#,
        )
        .bind(&progress.user_id)
        .bind(progress.quest_id)
        .bind(progress.status.as_str())
        .bind(&progress.submission_data)
        .bind(progress.completion_count)
        .bind(progress.points_earned)
        .bind(progress.started_at)
        .bind(progress.completed_at)
        .bind(&progress.rejection_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete_and_award(&self, progress: &QuestProgress, points: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Ledger rows are provisioned lazily; user identity is owned elsewhere.
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(&progress.user_id)
            .execute(&mut *tx)
            .await?;

        // The count guard is a compare-and-swap against a concurrent completion
        // from another process; in-process races are serialized by the
        // workflow's per-(user, quest) lock.
        let updated = sqlx::query(
            r#"
            INSERT INTO quest_progress (user_id, quest_id, status, submission_data,
                completion_count, points_earned, started_at, completed_at, rejection_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, quest_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                submission_data = EXCLUDED.submission_data,
                completion_count = EXCLUDED.completion_count,
                points_earned = EXCLUDED.points_earned,
                completed_at = EXCLUDED.completed_at,
                rejection_reason = EXCLUDED.rejection_reason
            WHERE quest_progress.completion_count = EXCLUDED.completion_count - 1
            "#,
        )
        .bind(&progress.user_id)
        .bind(progress.quest_id)
        .bind(progress.status.as_str())
        .bind(&progress.submission_data)
        .bind(progress.completion_count)
        .bind(progress.points_earned)
        .bind(progress.started_at)
        .bind(progress.completed_at)
        .bind(&progress.rejection_reason)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Ineligible(
                "progress was modified concurrently, retry the request".to_string(),
            ));
        }

        sqlx::query("UPDATE users SET reward_points = reward_points + $1 WHERE id = $2")
            .bind(points)
            .bind(&progress.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PrerequisiteLookup for PgStore {
    async fn completed_quest_ids(&self, user_id: &str, candidates: &[i64]) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT quest_id FROM quest_progress
            WHERE user_id = $1 AND status = 'completed' AND quest_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(candidates)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl UserLedger for PgStore {
    async fn balance(&self, user_id: &str) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT reward_points FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        balance.ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }
}
