use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::common::double_option;
use super::quest::{Quest, QuestStatus, QuestType, VerificationConfig};

fn default_config() -> serde_json::Value {
    serde_json::json!({})
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub quest_type: QuestType,
    #[validate(range(min = 0))]
    pub reward_points: i64,
    #[serde(default = "default_quest_status")]
    pub status: QuestStatus,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub is_repeatable: bool,
    #[validate(range(min = 1))]
    pub max_completions: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerequisite_quest_ids: Vec<i64>,
    #[serde(default = "default_multiplier")]
    #[validate(custom(function = "non_negative_multiplier"))]
    pub reward_multiplier: Decimal,
}

fn default_quest_status() -> QuestStatus {
    QuestStatus::Active
}

/// The multiplier scales points; a negative one would turn awards into
/// debits against the user's balance.
pub(crate) fn non_negative_multiplier(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("reward_multiplier must be non-negative"));
    }
    Ok(())
}

/// Partial update; absent fields keep their current value. `max_completions`
/// and the window dates use a double Option so `null` can clear them.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuestRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub quest_type: Option<QuestType>,
    pub reward_points: Option<i64>,
    pub status: Option<QuestStatus>,
    pub config: Option<serde_json::Value>,
    pub verification: Option<VerificationConfig>,
    pub is_repeatable: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_completions: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub prerequisite_quest_ids: Option<Vec<i64>>,
    pub reward_multiplier: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuestRequest {
    pub user_id: String,
    #[serde(default = "default_config")]
    pub submission_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuestRequest {
    pub user_id: String,
    pub approved: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuestsParams {
    /// When present, each quest in the response carries whether this user
    /// can currently complete it.
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestWithCompletability {
    #[serde(flatten)]
    pub quest: Quest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
