//! Streak accessor, missed-days reporter and daily study committer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lms_db::{
    DocumentStore, StoreError,
    models::STREAKS,
    repositories::streak::{create_streak, get_streak, save_streak, update_streak_counters},
};
use lms_streak::{Clock, Streak, StudyOutcome};

use super::{lock::KeyedLocks, model::MissedDays};
use crate::metrics::record_streak_update;

#[derive(Debug, Clone)]
pub struct StreakService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<KeyedLocks>,
}

impl StreakService {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Load the user's streak as of now, creating it on first access.
    ///
    /// The returned value is recalculated but the recalculation is not
    /// written back; only study and recovery commits persist changes.
    pub async fn get_streak(&self, user_id: &str) -> Result<Streak, StoreError> {
        self.load(user_id, self.clock.now()).await
    }

    /// Missed days and last study date, for showing recovery options.
    pub async fn calculate_missed_days(&self, user_id: &str) -> Result<MissedDays, StoreError> {
        let streak = self.get_streak(user_id).await.inspect_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to calculate missed days");
        })?;

        Ok(MissedDays {
            missed_days: streak.missed_days,
            last_study_date: streak.last_study_date,
        })
    }

    /// Advance the streak after a qualifying study action.
    ///
    /// Best effort: failures are logged and swallowed so the study action
    /// that triggered this is never interrupted.
    pub async fn update_streak_on_study(&self, user_id: &str) {
        match self.record_study(user_id).await {
            Ok(StudyOutcome::AlreadyCounted) => {
                tracing::debug!(user_id, "Study already counted today");
                record_streak_update("already_counted");
            }
            Ok(StudyOutcome::Extended { current_streak, .. }) => {
                tracing::info!(user_id, current_streak, "Streak extended");
                record_streak_update("extended");
            }
            Ok(StudyOutcome::Restarted { longest_streak, .. }) => {
                tracing::info!(user_id, longest_streak, "Streak restarted after a break");
                record_streak_update("restarted");
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to update streak after study");
                record_streak_update("error");
            }
        }
    }

    /// Whether `assessment_id` has already been credited to the user's streak.
    pub async fn has_recovery(&self, user_id: &str, assessment_id: &str) -> Result<bool, StoreError> {
        let streak = self.get_streak(user_id).await?;
        Ok(streak
            .recovery_history
            .iter()
            .any(|entry| entry.assessment_id == assessment_id))
    }

    /// Credit recovered days to the streak and append the history entry.
    ///
    /// Writes the whole streak document. An assessment already present in the
    /// recovery history is not credited again.
    pub async fn commit_recovery(
        &self,
        user_id: &str,
        recovered_days: u32,
        assessment_id: &str,
        objective_id: &str,
    ) -> Result<Streak, StoreError> {
        let _guard = self.locks.lock(user_id).await;
        let now = self.clock.now();

        let mut streak = self.load(user_id, now).await?;
        if streak
            .recovery_history
            .iter()
            .any(|entry| entry.assessment_id == assessment_id)
        {
            tracing::info!(user_id, assessment_id, "Recovery already credited");
            return Ok(streak);
        }
        streak.apply_recovery(now, recovered_days, assessment_id, objective_id);
        save_streak(self.store.as_ref(), &streak).await?;

        tracing::info!(
            user_id,
            assessment_id,
            recovered_days,
            current_streak = streak.current_streak,
            "Recovery committed to streak"
        );
        Ok(streak)
    }

    async fn record_study(&self, user_id: &str) -> Result<StudyOutcome, StoreError> {
        let _guard = self.locks.lock(user_id).await;
        let now = self.clock.now();

        let mut streak = self.load(user_id, now).await?;
        let outcome = streak.record_study(now);
        if outcome.changed() {
            update_streak_counters(self.store.as_ref(), &streak).await?;
        }
        Ok(outcome)
    }

    async fn load(&self, user_id: &str, now: DateTime<Utc>) -> Result<Streak, StoreError> {
        if let Some(stored) = get_streak(self.store.as_ref(), user_id).await? {
            return Ok(stored.recalculate(now));
        }

        let streak = Streak::new(user_id, now);
        match create_streak(self.store.as_ref(), &streak).await {
            Ok(()) => {
                tracing::info!(user_id, "Created streak for new user");
                Ok(streak)
            }
            // Lost a creation race; use the winner's document
            Err(StoreError::AlreadyExists { .. }) => get_streak(self.store.as_ref(), user_id)
                .await?
                .map(|stored| stored.recalculate(now))
                .ok_or_else(|| StoreError::Missing {
                    collection: STREAKS.to_string(),
                    id: user_id.to_string(),
                }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use lms_db::MemoryStore;
    use lms_streak::ManualClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, StreakService) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let service = StreakService::new(store.clone(), clock.clone());
        (store, clock, service)
    }

    async fn seed(store: &MemoryStore, last_study: DateTime<Utc>, current: u32, longest: u32) {
        let mut streak = Streak::new("user-1", last_study);
        streak.current_streak = current;
        streak.longest_streak = longest;
        save_streak(store, &streak).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_user_gets_zeroed_streak_without_drift() {
        let (store, clock, service) = setup();

        let first = service.get_streak("user-1").await.unwrap();
        assert_eq!(first.current_streak, 0);
        assert_eq!(first.longest_streak, 0);
        assert_eq!(first.missed_days, 0);
        assert_eq!(first.last_study_date, start());

        // Persisted immediately
        assert!(get_streak(store.as_ref(), "user-1").await.unwrap().is_some());

        clock.advance(Duration::hours(3));
        let second = service.get_streak("user-1").await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_read_path_does_not_persist_recalculation() {
        let (store, _clock, service) = setup();
        seed(&store, start() - Duration::days(4), 6, 6).await;

        let streak = service.get_streak("user-1").await.unwrap();
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.missed_days, 3);

        let stored = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 6);
        assert_eq!(stored.missed_days, 0);
    }

    #[tokio::test]
    async fn test_calculate_missed_days() {
        let (store, _clock, service) = setup();
        let last = start() - Duration::days(2);
        seed(&store, last, 3, 3).await;

        let missed = service.calculate_missed_days("user-1").await.unwrap();
        assert_eq!(missed.missed_days, 1);
        assert_eq!(missed.last_study_date, last);
    }

    #[tokio::test]
    async fn test_calculate_missed_days_propagates_store_errors() {
        let (store, _clock, service) = setup();
        store.set_unavailable(true);
        assert!(matches!(
            service.calculate_missed_days("user-1").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_study_on_consecutive_day_extends_once() {
        let (store, clock, service) = setup();
        seed(&store, start() - Duration::days(1), 4, 4).await;

        service.update_streak_on_study("user-1").await;
        let after_first = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(after_first.current_streak, 5);
        assert_eq!(after_first.longest_streak, 5);
        assert_eq!(after_first.last_study_date, start());

        clock.advance(Duration::hours(6));
        service.update_streak_on_study("user-1").await;
        let after_second = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(after_second, after_first);
    }

    #[tokio::test]
    async fn test_study_after_break_restarts() {
        let (store, _clock, service) = setup();
        seed(&store, start() - Duration::days(3), 9, 12).await;

        service.update_streak_on_study("user-1").await;
        let stored = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 1);
        assert_eq!(stored.longest_streak, 12);
        assert_eq!(stored.missed_days, 0);
    }

    #[tokio::test]
    async fn test_study_swallows_store_errors() {
        let (store, _clock, service) = setup();
        store.set_unavailable(true);
        // Must return normally
        service.update_streak_on_study("user-1").await;
    }

    #[tokio::test]
    async fn test_commit_recovery_adds_days_and_history() {
        let (store, _clock, service) = setup();
        seed(&store, start() - Duration::days(1), 5, 6).await;

        let streak = service
            .commit_recovery("user-1", 3, "assessment-1", "objective-1")
            .await
            .unwrap();
        assert_eq!(streak.current_streak, 8);
        assert_eq!(streak.longest_streak, 8);
        assert_eq!(streak.missed_days, 0);
        assert_eq!(streak.recovery_history.len(), 1);

        let stored = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(stored, streak);
    }

    #[tokio::test]
    async fn test_commit_recovery_credits_an_assessment_once() {
        let (store, _clock, service) = setup();
        seed(&store, start() - Duration::days(1), 5, 5).await;
        assert!(!service.has_recovery("user-1", "assessment-1").await.unwrap());

        service
            .commit_recovery("user-1", 3, "assessment-1", "objective-1")
            .await
            .unwrap();
        let again = service
            .commit_recovery("user-1", 3, "assessment-1", "objective-1")
            .await
            .unwrap();
        assert_eq!(again.current_streak, 8);
        assert_eq!(again.recovery_history.len(), 1);
        assert!(service.has_recovery("user-1", "assessment-1").await.unwrap());

        let stored = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 8);
        assert_eq!(stored.recovery_history.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_study_and_recovery_both_land() {
        let (store, _clock, service) = setup();
        seed(&store, start() - Duration::days(1), 2, 2).await;

        let study = {
            let service = service.clone();
            tokio::spawn(async move { service.update_streak_on_study("user-1").await })
        };
        let recovery = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .commit_recovery("user-1", 2, "assessment-1", "objective-1")
                    .await
            })
        };
        study.await.unwrap();
        recovery.await.unwrap().unwrap();

        let stored = get_streak(store.as_ref(), "user-1").await.unwrap().unwrap();
        assert_eq!(stored.recovery_history.len(), 1);
        // Study first: 2 -> 3 -> 5. Recovery first: 2 -> 4, then study is a no-op.
        assert!(
            stored.current_streak == 5 || stored.current_streak == 4,
            "unexpected streak {}",
            stored.current_streak
        );
    }
}
