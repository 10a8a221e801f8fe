//! Recovery assessment generation, validation and expiry.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::Duration;
use lms_db::{
    DocumentStore,
    models::{AnswerValue, AssessmentStatus, RecoveryAssessment},
    repositories::{
        objective::get_objective,
        recovery::{
            AssessmentCompletion, complete_assessment, create_assessment, get_assessment,
            list_pending, mark_expired,
        },
    },
    timestamp::parse_instant,
};
use lms_streak::{
    Clock, CooldownStatus, RecoveryLimits,
    recovery::{average_time_per_question, format_remaining, is_suspicious, passes, score},
};
use uuid::Uuid;

use super::{
    cooldown::check_cooldown,
    generator::QuestionGenerator,
    model::{
        DEFAULT_EXPLANATION, QuestionFeedback, RecoveryOptions, RecoveryResult, SubmittedAnswer,
    },
};
use crate::{
    error::ApiError,
    metrics::record_recovery_event,
    streak::{StreakService, lock::KeyedLocks},
};

#[derive(Debug, Clone)]
pub struct RecoveryService {
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn QuestionGenerator>,
    clock: Arc<dyn Clock>,
    limits: RecoveryLimits,
    streaks: StreakService,
    locks: Arc<KeyedLocks>,
}

impl RecoveryService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn QuestionGenerator>,
        clock: Arc<dyn Clock>,
        limits: RecoveryLimits,
        streaks: StreakService,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            limits,
            streaks,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub const fn limits(&self) -> &RecoveryLimits {
        &self.limits
    }

    /// Whether a new attempt on `objective_id` is allowed right now.
    pub async fn can_attempt_recovery(&self, user_id: &str, objective_id: &str) -> CooldownStatus {
        check_cooldown(
            self.store.as_ref(),
            user_id,
            objective_id,
            self.clock.now(),
            self.limits.cooldown,
        )
        .await
    }

    /// Estimate of what a recovery attempt on `objective_id` would cover.
    pub async fn recovery_options(
        &self,
        user_id: &str,
        objective_id: &str,
    ) -> Result<RecoveryOptions, ApiError> {
        let missed = self.streaks.calculate_missed_days(user_id).await?;
        let cooldown = self.can_attempt_recovery(user_id, objective_id).await;

        Ok(RecoveryOptions {
            missed_days: missed.missed_days,
            recoverable_days: self.limits.recoverable_days(missed.missed_days),
            question_count: self.limits.question_count(missed.missed_days),
            can_attempt: cooldown.can_attempt,
            cooldown_ends_at: cooldown.cooldown_ends_at,
        })
    }

    /// Generate and persist a pending recovery assessment.
    pub async fn generate_recovery_assessment(
        &self,
        user_id: &str,
        objective_id: &str,
        missed_days: u32,
    ) -> Result<RecoveryAssessment, ApiError> {
        // Held through the insert so concurrent requests see each other's attempt
        let _guard = self
            .locks
            .lock(&format!("attempt:{user_id}:{objective_id}"))
            .await;

        let cooldown = self.can_attempt_recovery(user_id, objective_id).await;
        if let Some(cooldown_ends_at) = cooldown.cooldown_ends_at.filter(|_| !cooldown.can_attempt)
        {
            let remaining = format_remaining(cooldown_ends_at - self.clock.now());
            tracing::info!(user_id, objective_id, %cooldown_ends_at, "Recovery attempt blocked by cooldown");
            record_recovery_event("cooldown_blocked");
            return Err(ApiError::CooldownActive {
                cooldown_ends_at,
                remaining,
            });
        }

        let objective = get_objective(self.store.as_ref(), objective_id)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, objective_id, error = %e, "Failed to load objective");
            })?
            .ok_or_else(|| ApiError::NotFound(format!("Objective {objective_id}")))?;
        if objective.user_id != user_id {
            tracing::warn!(user_id, objective_id, "Recovery requested for another user's objective");
            return Err(ApiError::Unauthorized(
                "objective does not belong to this user".to_string(),
            ));
        }

        let recoverable_days = self.limits.recoverable_days(missed_days);
        let question_count = self.limits.question_count(missed_days);
        if question_count == 0 {
            return Err(ApiError::Validation(
                "there are no missed days to recover".to_string(),
            ));
        }

        let questions = self
            .generator
            .generate_recovery_questions(&objective.profile(), missed_days, question_count)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, objective_id, error = %e, "Question generation failed");
                record_recovery_event("generation_failed");
            })?;

        let assessment = RecoveryAssessment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            objective_id: objective_id.to_string(),
            objective_title: objective.title,
            missed_days: recoverable_days,
            question_count: u32::try_from(questions.len()).unwrap_or(question_count),
            questions,
            status: AssessmentStatus::Pending,
            created_at: self.clock.now(),
            completed_at: None,
            score: None,
            passed: None,
            recovered_days: None,
        };
        create_assessment(self.store.as_ref(), &assessment)
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, objective_id, error = %e, "Failed to store recovery assessment");
            })?;

        tracing::info!(
            user_id,
            objective_id,
            assessment_id = %assessment.id,
            recoverable_days,
            question_count = assessment.question_count,
            "Recovery assessment generated"
        );
        record_recovery_event("generated");
        Ok(assessment)
    }

    pub async fn get_assessment(&self, assessment_id: &str) -> Result<RecoveryAssessment, ApiError> {
        get_assessment(self.store.as_ref(), assessment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Recovery assessment {assessment_id}")))
    }

    /// Score submitted answers, complete the assessment and credit the streak
    /// on a pass.
    pub async fn validate_recovery_assessment(
        &self,
        assessment_id: &str,
        answers: &[SubmittedAnswer],
        time_spent_secs: Option<f64>,
    ) -> Result<RecoveryResult, ApiError> {
        // Held until the streak is credited so it is credited once
        let _guard = self.locks.lock(assessment_id).await;

        let assessment = get_assessment(self.store.as_ref(), assessment_id)
            .await
            .inspect_err(|e| {
                tracing::error!(assessment_id, error = %e, "Failed to load recovery assessment");
            })?
            .ok_or_else(|| ApiError::NotFound(format!("Recovery assessment {assessment_id}")))?;
        let resuming = match assessment.status {
            AssessmentStatus::Completed => {
                // A pass whose streak credit did not land is finished here
                if assessment.passed != Some(true)
                    || self
                        .streaks
                        .has_recovery(&assessment.user_id, assessment_id)
                        .await?
                {
                    return Err(ApiError::AlreadyCompleted(assessment_id.to_string()));
                }
                tracing::warn!(
                    user_id = %assessment.user_id,
                    assessment_id,
                    "Resuming streak credit for a passed recovery assessment"
                );
                true
            }
            AssessmentStatus::Expired => {
                return Err(ApiError::AssessmentExpired(assessment_id.to_string()));
            }
            AssessmentStatus::Pending | AssessmentStatus::Unknown => false,
        };

        let recoverable_days = self.limits.recoverable_days(assessment.missed_days);
        let (correct_answers, feedback) = grade(&assessment, answers);

        let total_questions = assessment.question_count;
        let average_time_per_question = average_time_per_question(time_spent_secs, total_questions);
        let (score, passed, recovered_days) = if resuming {
            (
                assessment
                    .score
                    .unwrap_or_else(|| score(correct_answers, total_questions)),
                true,
                assessment.recovered_days.unwrap_or(recoverable_days),
            )
        } else {
            let score = score(correct_answers, total_questions);
            let passed = passes(score);
            let recovered_days = if passed { recoverable_days } else { 0 };

            complete_assessment(
                self.store.as_ref(),
                assessment_id,
                AssessmentCompletion {
                    score,
                    passed,
                    recovered_days,
                    completed_at: self.clock.now(),
                },
            )
            .await
            .inspect_err(|e| {
                tracing::error!(assessment_id, error = %e, "Failed to complete recovery assessment");
            })?;
            (score, passed, recovered_days)
        };
        let suspicious_pattern = is_suspicious(passed, average_time_per_question);

        let streak = if passed {
            self.streaks
                .commit_recovery(
                    &assessment.user_id,
                    recovered_days,
                    assessment_id,
                    &assessment.objective_id,
                )
                .await
        } else {
            self.streaks.get_streak(&assessment.user_id).await
        }
        .inspect_err(|e| {
            tracing::error!(
                user_id = %assessment.user_id,
                assessment_id,
                error = %e,
                "Failed to update streak after recovery assessment"
            );
        })?;

        if suspicious_pattern {
            tracing::warn!(
                user_id = %assessment.user_id,
                assessment_id,
                average_time_per_question,
                "Recovery passed suspiciously fast"
            );
            record_recovery_event("suspicious");
        }
        tracing::info!(
            user_id = %assessment.user_id,
            assessment_id,
            score,
            passed,
            recovered_days,
            "Recovery assessment validated"
        );
        record_recovery_event(if passed { "passed" } else { "failed" });

        Ok(RecoveryResult {
            assessment_id: assessment_id.to_string(),
            score,
            passed,
            correct_answers,
            total_questions,
            recovered_days,
            new_streak: streak.current_streak,
            feedback,
            average_time_per_question,
            suspicious_pattern,
        })
    }

    /// Mark pending assessments older than `max_age` as expired.
    ///
    /// Returns how many were expired.
    pub async fn expire_stale_assessments(&self, max_age: Duration) -> Result<usize, ApiError> {
        let cutoff = self.clock.now() - max_age;
        let mut expired = 0;

        for doc in list_pending(self.store.as_ref()).await? {
            let Some(created_at) = doc.data.get("createdAt").and_then(parse_instant) else {
                tracing::debug!(assessment_id = %doc.id, "Skipping pending assessment with unreadable createdAt");
                continue;
            };
            if created_at > cutoff {
                continue;
            }

            let _guard = self.locks.lock(&doc.id).await;
            // Might have been validated while waiting for the lock
            match get_assessment(self.store.as_ref(), &doc.id).await {
                Ok(Some(current)) if current.status == AssessmentStatus::Pending => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(assessment_id = %doc.id, error = %e, "Skipping unreadable pending assessment");
                    continue;
                }
            }
            mark_expired(self.store.as_ref(), &doc.id).await?;
            expired += 1;
        }

        if expired > 0 {
            tracing::info!(expired, "Expired stale recovery assessments");
        }
        Ok(expired)
    }
}

/// Count correct answers and build per-question feedback.
///
/// Each question counts at most once, so the count never exceeds the
/// number of questions.
fn grade(
    assessment: &RecoveryAssessment,
    answers: &[SubmittedAnswer],
) -> (u32, Vec<QuestionFeedback>) {
    let questions: HashMap<&str, _> = assessment
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q))
        .collect();

    let mut answered = HashSet::new();
    let mut correct_answers = 0;
    let mut feedback = Vec::with_capacity(answers.len());
    for answer in answers {
        let Some(question) = questions.get(answer.question_id.as_str()) else {
            continue;
        };
        // First submission for a question wins
        if !answered.insert(question.id.as_str()) {
            continue;
        }

        let user_answer = AnswerValue::from_submitted(&answer.answer);
        let is_correct = user_answer == question.correct_answer;
        if is_correct {
            correct_answers += 1;
        }

        let explanation = if question.explanation.is_empty() {
            DEFAULT_EXPLANATION.to_string()
        } else {
            question.explanation.clone()
        };
        feedback.push(QuestionFeedback {
            question_id: question.id.clone(),
            question: question.question.clone(),
            is_correct,
            user_answer,
            correct_answer: question.correct_answer.clone(),
            explanation,
        });
    }

    (correct_answers, feedback)
}
