use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use super::model::{
    GenerateRecoveryRequest, RecoveryAssessmentView, RecoveryOptions, RecoveryResult,
    ValidateRecoveryRequest,
};
use crate::{ApiState, error::ApiError};

/// Create the recovery routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/recovery/{user_id}/objectives/{objective_id}/options",
            get(get_recovery_options),
        )
        .route("/recovery/assessments", post(generate_assessment))
        .route("/recovery/assessments/{assessment_id}", get(get_assessment))
        .route(
            "/recovery/assessments/{assessment_id}/validate",
            post(validate_assessment),
        )
}

async fn get_recovery_options(
    State(state): State<ApiState>,
    Path((user_id, objective_id)): Path<(String, String)>,
) -> Result<Json<RecoveryOptions>, ApiError> {
    let options = state
        .recovery
        .recovery_options(&user_id, &objective_id)
        .await?;
    Ok(Json(options))
}

async fn generate_assessment(
    State(state): State<ApiState>,
    Json(payload): Json<GenerateRecoveryRequest>,
) -> Result<(StatusCode, Json<RecoveryAssessmentView>), ApiError> {
    payload.validate()?;

    let assessment = state
        .recovery
        .generate_recovery_assessment(&payload.user_id, &payload.objective_id, payload.missed_days)
        .await?;
    Ok((StatusCode::CREATED, Json(assessment.into())))
}

async fn get_assessment(
    State(state): State<ApiState>,
    Path(assessment_id): Path<String>,
) -> Result<Json<RecoveryAssessmentView>, ApiError> {
    let assessment = state.recovery.get_assessment(&assessment_id).await?;
    Ok(Json(assessment.into()))
}

async fn validate_assessment(
    State(state): State<ApiState>,
    Path(assessment_id): Path<String>,
    Json(payload): Json<ValidateRecoveryRequest>,
) -> Result<Json<RecoveryResult>, ApiError> {
    payload.validate()?;

    let result = state
        .recovery
        .validate_recovery_assessment(&assessment_id, &payload.answers, payload.time_spent)
        .await?;
    Ok(Json(result))
}
