use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;

use crate::errors::AppError;
use crate::store::UserLedger;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:user_id/points", get(get_points))
}

/// Current reward-point balance for a user. Balances exist once a first
/// completion has credited them; an unknown user is a 404.
async fn get_points(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let balance = state.store.balance(&user_id).await?;
    Ok(Json(json!({
        "user_id": user_id,
        "reward_points": balance,
    })))
}
