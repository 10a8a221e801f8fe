//! Client for the external question-generation service.

use async_trait::async_trait;
use lms_db::models::{ObjectiveProfile, QuizQuestion};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("question generator is not configured")]
    NotConfigured,
    #[error("request to question generator failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("question generator responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("question generator returned no questions")]
    Empty,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync + std::fmt::Debug {
    /// Produce `question_count` questions reviewing `profile`, covering a
    /// gap of `missed_days` days.
    async fn generate_recovery_questions(
        &self,
        profile: &ObjectiveProfile,
        missed_days: u32,
        question_count: u32,
    ) -> Result<Vec<QuizQuestion>, GenerationError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationRequest<'a> {
    profile: &'a ObjectiveProfile,
    missed_days: u32,
    question_count: u32,
}

#[derive(Deserialize)]
struct GenerationResponse {
    questions: Vec<QuizQuestion>,
}

/// Calls a JSON-over-HTTP question generator.
#[derive(Debug, Clone)]
pub struct HttpQuestionGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpQuestionGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl QuestionGenerator for HttpQuestionGenerator {
    async fn generate_recovery_questions(
        &self,
        profile: &ObjectiveProfile,
        missed_days: u32,
        question_count: u32,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        let mut request = self.client.post(&self.endpoint).json(&GenerationRequest {
            profile,
            missed_days,
            question_count,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::Status(response.status()));
        }

        let body: GenerationResponse = response.json().await?;
        let questions = finalize_questions(body.questions, question_count);
        if questions.is_empty() {
            return Err(GenerationError::Empty);
        }

        tracing::debug!(
            objective_id = %profile.objective_id,
            requested = question_count,
            received = questions.len(),
            "Generated recovery questions"
        );
        Ok(questions)
    }
}

/// Trim to the requested size and give every question a stable id.
fn finalize_questions(mut questions: Vec<QuizQuestion>, question_count: u32) -> Vec<QuizQuestion> {
    questions.truncate(usize::try_from(question_count).unwrap_or(usize::MAX));
    for (index, question) in questions.iter_mut().enumerate() {
        if question.id.is_empty() {
            question.id = format!("q{}", index + 1);
        }
    }
    questions
}

/// Stand-in used when no generator endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledQuestionGenerator;

#[async_trait]
impl QuestionGenerator for DisabledQuestionGenerator {
    async fn generate_recovery_questions(
        &self,
        _profile: &ObjectiveProfile,
        _missed_days: u32,
        _question_count: u32,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}
