use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use validator::Validate;

use crate::engine::can_complete;
use crate::errors::AppError;
use crate::models::{
    non_negative_multiplier, CreateQuestRequest, ListQuestsParams, Quest, QuestProgress,
    QuestWithCompletability, SubmitQuestRequest, UpdateQuestRequest, VerifyQuestRequest,
};
use crate::store::{ProgressStore, QuestStore};
use crate::validation::validate_quest_config;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_quest).get(list_quests))
        .route("/:quest_id", get(get_quest).put(update_quest))
        .route("/:quest_id/submit", post(submit_quest))
        .route("/:quest_id/verify", post(verify_quest))
        .route("/:quest_id/progress/:user_id", get(get_progress))
}

/// Create a quest (admin path). The type-specific config is validated
/// structurally and every violation is reported in one response.
async fn create_quest(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestRequest>,
) -> Result<Json<Quest>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Validation error: {}", e)))?;

    validate_quest_config(payload.quest_type, &payload.config)
        .map_err(AppError::InvalidConfig)?;

    // A quest that does not exist yet cannot be on anyone's prerequisite
    // list, so existence of the referenced quests is the whole check here.
    ensure_prerequisites_exist(&state, &payload.prerequisite_quest_ids).await?;

    let quest = Quest {
        id: 0,
        title: payload.title,
        description: payload.description,
        quest_type: payload.quest_type,
        reward_points: payload.reward_points,
        status: payload.status,
        config: payload.config,
        verification: payload.verification,
        is_repeatable: payload.is_repeatable,
        max_completions: payload.max_completions,
        start_date: payload.start_date,
        end_date: payload.end_date,
        prerequisite_quest_ids: payload.prerequisite_quest_ids,
        reward_multiplier: payload.reward_multiplier,
        created_at: Utc::now(),
        updated_at: None,
    };

    let stored = state.store.insert_quest(&quest).await?;
    tracing::info!("Created quest {} ({})", stored.id, stored.quest_type);
    Ok(Json(stored))
}

/// Partial update of a quest (admin path). Re-validates the config against
/// the effective type and rejects prerequisite edits that would close a
/// dependency cycle.
async fn update_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<i64>,
    Json(payload): Json<UpdateQuestRequest>,
) -> Result<Json<Quest>, AppError> {
    let mut quest = state
        .store
        .find_quest(quest_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("quest {}", quest_id)))?;

    if let Some(title) = payload.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".to_string()));
        }
        quest.title = title;
    }
    if let Some(description) = payload.description {
        quest.description = description;
    }
    if let Some(quest_type) = payload.quest_type {
        quest.quest_type = quest_type;
    }
    if let Some(reward_points) = payload.reward_points {
        if reward_points < 0 {
            return Err(AppError::BadRequest(
                "reward_points must be non-negative".to_string(),
            ));
        }
        quest.reward_points = reward_points;
    }
    if let Some(status) = payload.status {
        quest.status = status;
    }
    if let Some(config) = payload.config {
        quest.config = config;
    }
    if let Some(verification) = payload.verification {
        quest.verification = verification;
    }
    if let Some(is_repeatable) = payload.is_repeatable {
        quest.is_repeatable = is_repeatable;
    }
    if let Some(max_completions) = payload.max_completions {
        if matches!(max_completions, Some(n) if n < 1) {
            return Err(AppError::BadRequest(
                "max_completions must be at least 1".to_string(),
            ));
        }
        quest.max_completions = max_completions;
    }
    if let Some(start_date) = payload.start_date {
        quest.start_date = start_date;
    }
    if let Some(end_date) = payload.end_date {
        quest.end_date = end_date;
    }
    if let Some(reward_multiplier) = payload.reward_multiplier {
        if non_negative_multiplier(&reward_multiplier).is_err() {
            return Err(AppError::BadRequest(
                "reward_multiplier must be non-negative".to_string(),
            ));
        }
        quest.reward_multiplier = reward_multiplier;
    }
    if let Some(prerequisite_quest_ids) = payload.prerequisite_quest_ids {
        ensure_prerequisites_exist(&state, &prerequisite_quest_ids).await?;
        ensure_no_cycle(&state, quest_id, &prerequisite_quest_ids).await?;
        quest.prerequisite_quest_ids = prerequisite_quest_ids;
    }

    validate_quest_config(quest.quest_type, &quest.config).map_err(AppError::InvalidConfig)?;

    let stored = state.store.update_quest(&quest).await?;
    Ok(Json(stored))
}

async fn get_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<i64>,
) -> Result<Json<Quest>, AppError> {
    let quest = state
        .store
        .find_quest(quest_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("quest {}", quest_id)))?;
    Ok(Json(quest))
}

/// GET /api/quests - list quests; with `?user_id=` each entry also says
/// whether that user can currently complete it. Read-only composition of
/// the availability and repeat checks.
async fn list_quests(
    State(state): State<AppState>,
    Query(params): Query<ListQuestsParams>,
) -> Result<Json<Vec<QuestWithCompletability>>, AppError> {
    let quests = state.store.list_quests().await?;
    let now = Utc::now();

    // One progress query per request rather than one per quest.
    let progress_by_quest: Option<HashMap<i64, QuestProgress>> = match &params.user_id {
        Some(user_id) => Some(
            state
                .store
                .list_user_progress(user_id)
                .await?
                .into_iter()
                .map(|p| (p.quest_id, p))
                .collect(),
        ),
        None => None,
    };

    let mut out = Vec::with_capacity(quests.len());
    for quest in quests {
        let (completable, reason) = match &progress_by_quest {
            Some(progress) => {
                let c = can_complete(&quest, progress.get(&quest.id), now);
                (Some(c.can_complete), c.reason)
            }
            None => (None, None),
        };
        out.push(QuestWithCompletability { quest, can_complete: completable, reason });
    }

    Ok(Json(out))
}

/// Submit proof of completion for a quest.
async fn submit_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<i64>,
    Json(payload): Json<SubmitQuestRequest>,
) -> Result<Json<QuestProgress>, AppError> {
    if payload.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id must not be empty".to_string()));
    }
    let progress = state
        .workflow
        .submit(&payload.user_id, quest_id, payload.submission_data, Utc::now())
        .await?;
    Ok(Json(progress))
}

/// Approve or reject a pending submission (admin path).
async fn verify_quest(
    State(state): State<AppState>,
    Path(quest_id): Path<i64>,
    Json(payload): Json<VerifyQuestRequest>,
) -> Result<Json<QuestProgress>, AppError> {
    let progress = state
        .workflow
        .verify(&payload.user_id, quest_id, payload.approved, payload.reason, Utc::now())
        .await?;
    Ok(Json(progress))
}

async fn get_progress(
    State(state): State<AppState>,
    Path((quest_id, user_id)): Path<(i64, String)>,
) -> Result<Json<QuestProgress>, AppError> {
    let progress = state
        .store
        .find_progress(&user_id, quest_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("progress for user {} on quest {}", user_id, quest_id))
        })?;
    Ok(Json(progress))
}

async fn ensure_prerequisites_exist(state: &AppState, ids: &[i64]) -> Result<(), AppError> {
    for id in ids {
        if state.store.find_quest(*id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "prerequisite quest {} does not exist",
                id
            )));
        }
    }
    Ok(())
}

/// Walks the direct-dependency lists reachable from the proposed
/// prerequisites and rejects the edit if any path leads back to the quest
/// being edited. Runtime checks never traverse; acyclicity is enforced here,
/// at authoring time.
async fn ensure_no_cycle(
    state: &AppState,
    quest_id: i64,
    prerequisite_ids: &[i64],
) -> Result<(), AppError> {
    if prerequisite_ids.contains(&quest_id) {
        return Err(AppError::BadRequest(
            "a quest cannot be its own prerequisite".to_string(),
        ));
    }

    let mut stack: Vec<i64> = prerequisite_ids.to_vec();
    let mut visited: HashSet<i64> = HashSet::new();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(quest) = state.store.find_quest(id).await? {
            for dep in quest.prerequisite_quest_ids {
                if dep == quest_id {
                    return Err(AppError::BadRequest(format!(
                        "prerequisite cycle detected through quest {}",
                        id
                    )));
                }
                stack.push(dep);
            }
        }
    }
    Ok(())
}
