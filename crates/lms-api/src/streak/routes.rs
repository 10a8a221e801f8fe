use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use lms_streak::Streak;

use super::model::MissedDays;
use crate::{ApiState, error::ApiError};

/// Create the streak routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/streaks/{user_id}", get(get_streak))
        .route("/streaks/{user_id}/missed-days", get(get_missed_days))
        .route("/streaks/{user_id}/study", post(record_study))
}

async fn get_streak(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<Streak>, ApiError> {
    let streak = state.streaks.get_streak(&user_id).await?;
    Ok(Json(streak))
}

async fn get_missed_days(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<MissedDays>, ApiError> {
    let missed = state.streaks.calculate_missed_days(&user_id).await?;
    Ok(Json(missed))
}

/// Best effort, always 204
async fn record_study(State(state): State<ApiState>, Path(user_id): Path<String>) -> StatusCode {
    state.streaks.update_streak_on_study(&user_id).await;
    StatusCode::NO_CONTENT
}
