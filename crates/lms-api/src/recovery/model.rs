use chrono::{DateTime, Utc};
use lms_db::models::{AnswerValue, AssessmentStatus, RecoveryAssessment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Shown when a generated question came without an explanation.
pub const DEFAULT_EXPLANATION: &str = "No explanation provided.";

/// One answer submitted for validation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: String,
    /// Option index or free text.
    pub answer: Value,
}

/// Per-question result returned after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub question_id: String,
    pub question: String,
    pub is_correct: bool,
    pub user_answer: AnswerValue,
    pub correct_answer: AnswerValue,
    pub explanation: String,
}

/// Outcome of validating a recovery assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResult {
    pub assessment_id: String,
    pub score: f64,
    pub passed: bool,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub recovered_days: u32,
    pub new_streak: u32,
    pub feedback: Vec<QuestionFeedback>,
    pub average_time_per_question: Option<f64>,
    /// Passed implausibly fast. Informational only.
    pub suspicious_pattern: bool,
}

/// What a recovery on an objective would look like right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryOptions {
    pub missed_days: u32,
    pub recoverable_days: u32,
    pub question_count: u32,
    pub can_attempt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRecoveryRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub objective_id: String,
    #[validate(range(max = 3650))]
    pub missed_days: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRecoveryRequest {
    #[validate(length(max = 500))]
    pub answers: Vec<SubmittedAnswer>,
    /// Total seconds spent on the assessment.
    #[validate(range(min = 0.0, max = 86400.0))]
    pub time_spent: Option<f64>,
}

/// A question as shown to the learner, without its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub difficulty: String,
}

/// A recovery assessment as returned over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAssessmentView {
    pub id: String,
    pub user_id: String,
    pub objective_id: String,
    pub objective_title: String,
    pub missed_days: u32,
    pub question_count: u32,
    pub questions: Vec<QuestionView>,
    pub status: AssessmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_days: Option<u32>,
}

impl From<RecoveryAssessment> for RecoveryAssessmentView {
    fn from(assessment: RecoveryAssessment) -> Self {
        Self {
            id: assessment.id,
            user_id: assessment.user_id,
            objective_id: assessment.objective_id,
            objective_title: assessment.objective_title,
            missed_days: assessment.missed_days,
            question_count: assessment.question_count,
            questions: assessment
                .questions
                .into_iter()
                .map(|q| QuestionView {
                    id: q.id,
                    question: q.question,
                    options: q.options,
                    difficulty: q.difficulty,
                })
                .collect(),
            status: assessment.status,
            created_at: assessment.created_at,
            completed_at: assessment.completed_at,
            score: assessment.score,
            passed: assessment.passed,
            recovered_days: assessment.recovered_days,
        }
    }
}
