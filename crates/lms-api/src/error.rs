use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use lms_db::StoreError;
use serde_json::json;
use thiserror::Error;

use crate::recovery::generator::GenerationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Recovery assessment {0} has already been completed")]
    AlreadyCompleted(String),
    #[error("Recovery assessment {0} has expired")]
    AssessmentExpired(String),
    #[error("Recovery is on cooldown. Please wait {remaining} before trying again.")]
    CooldownActive {
        cooldown_ends_at: DateTime<Utc>,
        remaining: String,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Question generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::AlreadyCompleted(_) => StatusCode::CONFLICT,
            Self::AssessmentExpired(_) => StatusCode::GONE,
            Self::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Self::CooldownActive {
                cooldown_ends_at,
                remaining,
            } => json!({
                "error": self.to_string(),
                "cooldownEndsAt": cooldown_ends_at,
                "remaining": remaining,
            }),
            // Storage details stay in the logs
            Self::Store(e) => {
                tracing::error!("Document store error: {e}");
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
