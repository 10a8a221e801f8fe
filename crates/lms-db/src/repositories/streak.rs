use lms_streak::Streak;
use serde_json::{Map, Value};

use super::{decode, encode};
use crate::{
    models::{STREAKS, StreakDocument},
    store::{DocumentStore, StoreResult},
    timestamp::StoreTimestamp,
};

/// Load a user's streak exactly as persisted (no recalculation).
pub async fn get_streak(store: &dyn DocumentStore, user_id: &str) -> StoreResult<Option<Streak>> {
    let Some(value) = store.get(STREAKS, user_id).await? else {
        return Ok(None);
    };
    let doc: StreakDocument = decode(STREAKS, user_id, value)?;
    Ok(Some(doc.into()))
}

/// Persist a brand-new streak.
pub async fn create_streak(store: &dyn DocumentStore, streak: &Streak) -> StoreResult<()> {
    let doc = encode(STREAKS, &StreakDocument::from(streak))?;
    store.create(STREAKS, &streak.user_id, doc).await?;
    Ok(())
}

/// Overwrite the whole streak document, recovery history included.
pub async fn save_streak(store: &dyn DocumentStore, streak: &Streak) -> StoreResult<()> {
    let doc = encode(STREAKS, &StreakDocument::from(streak))?;
    store.set(STREAKS, &streak.user_id, doc).await
}

/// Write only the counters touched by a daily study action.
pub async fn update_streak_counters(store: &dyn DocumentStore, streak: &Streak) -> StoreResult<()> {
    let mut patch = Map::new();
    patch.insert("currentStreak".to_string(), Value::from(streak.current_streak));
    patch.insert("longestStreak".to_string(), Value::from(streak.longest_streak));
    patch.insert(
        "lastStudyDate".to_string(),
        encode(STREAKS, &StoreTimestamp(streak.last_study_date))?,
    );
    patch.insert("missedDays".to_string(), Value::from(streak.missed_days));
    patch.insert(
        "updatedAt".to_string(),
        encode(STREAKS, &StoreTimestamp(streak.updated_at))?,
    );
    store.update(STREAKS, &streak.user_id, patch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreError, memory::MemoryStore};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_get_is_lossless() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 7, 7, 7, 7, 7).unwrap() + Duration::nanoseconds(77);
        let streak = Streak::new("user-1", now);

        create_streak(&store, &streak).await.unwrap();
        assert_eq!(get_streak(&store, "user-1").await.unwrap(), Some(streak));
        assert_eq!(get_streak(&store, "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_counter_update_keeps_history() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2025, 7, 7, 7, 0, 0).unwrap();
        let mut streak = Streak::new("user-1", now);
        streak.apply_recovery(now, 2, "a-1", "o-1");
        save_streak(&store, &streak).await.unwrap();

        streak.record_study(now + Duration::days(1));
        // Drop history locally; the partial update must not touch it
        let mut partial = streak.clone();
        partial.recovery_history.clear();
        update_streak_counters(&store, &partial).await.unwrap();

        let stored = get_streak(&store, "user-1").await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 3);
        assert_eq!(stored.recovery_history.len(), 1);
        assert_eq!(stored, streak);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_a_decode_error() {
        let store = MemoryStore::new();
        store
            .create(STREAKS, "user-1", json!({ "userId": "user-1", "lastStudyDate": "soon" }))
            .await
            .unwrap();

        let err = get_streak(&store, "user-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}
