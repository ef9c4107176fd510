use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid quest config")]
    InvalidConfig(Vec<String>),

    #[error("invalid submission")]
    InvalidSubmission(Vec<String>),

    #[error("{0}")]
    Ineligible(String),

    #[error("prerequisite quests not completed")]
    PrerequisiteUnmet(Vec<i64>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, mut body) = match &self {
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Database error occurred" }),
                )
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{} not found", what) }),
            ),
            AppError::InvalidConfig(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "invalid quest config", "errors": errors }),
            ),
            AppError::InvalidSubmission(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "invalid submission", "errors": errors }),
            ),
            AppError::Ineligible(reason) => (StatusCode::CONFLICT, json!({ "error": reason })),
            AppError::PrerequisiteUnmet(missing) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "prerequisite quests not completed",
                    "missing_quest_ids": missing,
                }),
            ),
        };

        body["status"] = json!(status.as_u16());

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
