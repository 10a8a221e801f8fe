//! Cooldown guard for recovery attempts.

use chrono::{DateTime, Duration, Utc};
use lms_db::{
    DocumentStore, StoredDocument,
    models::AssessmentStatus,
    repositories::recovery::list_attempts,
    timestamp::parse_instant,
};
use lms_streak::{CooldownStatus, recovery::evaluate_cooldown};

/// Check whether `user_id` may start another recovery attempt on `objective_id`.
///
/// Fails open: if prior attempts cannot be read, the attempt is allowed.
pub async fn check_cooldown(
    store: &dyn DocumentStore,
    user_id: &str,
    objective_id: &str,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> CooldownStatus {
    let attempts = match list_attempts(store, user_id, objective_id).await {
        Ok(attempts) => attempts,
        Err(e) => {
            tracing::warn!(
                user_id,
                objective_id,
                error = %e,
                "Could not read prior recovery attempts, allowing attempt"
            );
            return CooldownStatus::clear();
        }
    };

    evaluate_cooldown(
        attempts.iter().filter_map(counted_attempt_time),
        now,
        cooldown,
    )
}

/// Creation time of an attempt that still counts against the cooldown.
fn counted_attempt_time(doc: &StoredDocument) -> Option<DateTime<Utc>> {
    let status = doc
        .data
        .get("status")
        .cloned()
        .and_then(|s| serde_json::from_value::<AssessmentStatus>(s).ok())?;
    if !status.counts_for_cooldown() {
        return None;
    }

    let created_at = doc.data.get("createdAt").and_then(parse_instant);
    if created_at.is_none() {
        tracing::debug!(assessment_id = %doc.id, "Skipping attempt with unreadable createdAt");
    }
    created_at
}
