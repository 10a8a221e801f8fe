use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{decode, encode};
use crate::{
    models::{AssessmentStatus, RECOVERY_ASSESSMENTS, RecoveryAssessment},
    store::{DocumentStore, Filter, StoreResult, StoredDocument},
    timestamp::StoreTimestamp,
};

pub async fn get_assessment(
    store: &dyn DocumentStore,
    assessment_id: &str,
) -> StoreResult<Option<RecoveryAssessment>> {
    let Some(value) = store.get(RECOVERY_ASSESSMENTS, assessment_id).await? else {
        return Ok(None);
    };
    decode(RECOVERY_ASSESSMENTS, assessment_id, value).map(Some)
}

pub async fn create_assessment(
    store: &dyn DocumentStore,
    assessment: &RecoveryAssessment,
) -> StoreResult<String> {
    let doc = encode(RECOVERY_ASSESSMENTS, assessment)?;
    store.create(RECOVERY_ASSESSMENTS, &assessment.id, doc).await
}

/// Final outcome written onto an assessment when it is validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentCompletion {
    pub score: f64,
    pub passed: bool,
    pub recovered_days: u32,
    pub completed_at: DateTime<Utc>,
}

pub async fn complete_assessment(
    store: &dyn DocumentStore,
    assessment_id: &str,
    completion: AssessmentCompletion,
) -> StoreResult<()> {
    let mut patch = Map::new();
    patch.insert(
        "status".to_string(),
        Value::from(AssessmentStatus::Completed.as_str()),
    );
    patch.insert("score".to_string(), Value::from(completion.score));
    patch.insert("passed".to_string(), Value::from(completion.passed));
    patch.insert(
        "recoveredDays".to_string(),
        Value::from(completion.recovered_days),
    );
    patch.insert(
        "completedAt".to_string(),
        encode(RECOVERY_ASSESSMENTS, &StoreTimestamp(completion.completed_at))?,
    );
    store.update(RECOVERY_ASSESSMENTS, assessment_id, patch).await
}

pub async fn mark_expired(store: &dyn DocumentStore, assessment_id: &str) -> StoreResult<()> {
    let mut patch = Map::new();
    patch.insert(
        "status".to_string(),
        Value::from(AssessmentStatus::Expired.as_str()),
    );
    store.update(RECOVERY_ASSESSMENTS, assessment_id, patch).await
}

/// Raw attempt documents for a (user, objective) pair.
///
/// Returned undecoded: attempts written by older clients may not match the
/// current [`RecoveryAssessment`] shape, and the cooldown check only needs
/// `status` and `createdAt`.
pub async fn list_attempts(
    store: &dyn DocumentStore,
    user_id: &str,
    objective_id: &str,
) -> StoreResult<Vec<StoredDocument>> {
    store
        .query(
            RECOVERY_ASSESSMENTS,
            &[
                Filter::eq("userId", user_id),
                Filter::eq("objectiveId", objective_id),
            ],
        )
        .await
}

/// Raw documents of every assessment still pending.
pub async fn list_pending(store: &dyn DocumentStore) -> StoreResult<Vec<StoredDocument>> {
    store
        .query(
            RECOVERY_ASSESSMENTS,
            &[Filter::eq("status", AssessmentStatus::Pending.as_str())],
        )
        .await
}
