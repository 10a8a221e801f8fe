//! Streak entity and its state transitions.
//!
//! A streak is either [`StreakState::Active`] or [`StreakState::Broken`]; the
//! state is never stored, it is derived from `last_study_date` each time the
//! streak is read. Recovery is not a state of its own: a successful recovery
//! puts the streak straight back into a fresh active state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::day::days_between;

/// One successful recovery, appended to [`Streak::recovery_history`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryHistoryEntry {
    pub date: DateTime<Utc>,
    pub recovered_days: u32,
    pub assessment_id: String,
    pub objective_id: String,
}

/// Daily study streak of a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub user_id: String,
    /// Consecutive qualifying study days.
    pub current_streak: u32,
    /// Highest `current_streak` ever reached. Never decreases.
    pub longest_streak: u32,
    /// Last qualifying study action or successful recovery.
    pub last_study_date: DateTime<Utc>,
    /// Days missed beyond the grace day, as of the last recalculation.
    pub missed_days: u32,
    pub recovery_history: Vec<RecoveryHistoryEntry>,
    pub updated_at: DateTime<Utc>,
}

/// Whether the streak survived the days since the last study action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakState {
    /// Studied today or yesterday.
    Active,
    /// At least one whole calendar day was skipped.
    Broken {
        /// Skipped days, not counting today.
        missed_days: u32,
    },
}

/// Result of applying a qualifying study action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyOutcome {
    /// A study action was already counted for this calendar day.
    AlreadyCounted,
    /// Studied on the day after the last study day.
    Extended { current_streak: u32, longest_streak: u32 },
    /// The streak had broken; this action starts a new one at 1.
    Restarted { current_streak: u32, longest_streak: u32 },
}

impl StudyOutcome {
    /// Whether the streak needs to be written back.
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::AlreadyCounted)
    }
}

impl Streak {
    /// A fresh streak for a user who has never been seen before.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            current_streak: 0,
            longest_streak: 0,
            last_study_date: now,
            missed_days: 0,
            recovery_history: Vec::new(),
            updated_at: now,
        }
    }

    /// Calendar days between the last study action and `now`.
    pub fn days_since_last_study(&self, now: DateTime<Utc>) -> i64 {
        days_between(now, self.last_study_date)
    }

    /// Evaluate the streak state as of `now`.
    pub fn state(&self, now: DateTime<Utc>) -> StreakState {
        let days = self.days_since_last_study(now);
        if days <= 1 {
            StreakState::Active
        } else {
            StreakState::Broken {
                missed_days: u32::try_from(days - 1).unwrap_or(u32::MAX),
            }
        }
    }

    /// Return the streak as it should be presented at `now`.
    ///
    /// An active streak comes back untouched, including its stored
    /// `missed_days`. A broken one loses its current count and gets a fresh
    /// missed-day count. Nothing is persisted.
    pub fn recalculate(&self, now: DateTime<Utc>) -> Self {
        match self.state(now) {
            StreakState::Active => self.clone(),
            StreakState::Broken { missed_days } => Self {
                current_streak: 0,
                missed_days,
                ..self.clone()
            },
        }
    }

    /// Apply a qualifying study action at `now`.
    ///
    /// Repeated calls on the same calendar day are no-ops.
    pub fn record_study(&mut self, now: DateTime<Utc>) -> StudyOutcome {
        let days = self.days_since_last_study(now);
        if days <= 0 {
            return StudyOutcome::AlreadyCounted;
        }

        let consecutive = days == 1;
        self.current_streak = if consecutive {
            self.current_streak.saturating_add(1)
        } else {
            1
        };
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_study_date = now;
        self.missed_days = 0;
        self.updated_at = now;

        if consecutive {
            StudyOutcome::Extended {
                current_streak: self.current_streak,
                longest_streak: self.longest_streak,
            }
        } else {
            StudyOutcome::Restarted {
                current_streak: self.current_streak,
                longest_streak: self.longest_streak,
            }
        }
    }

    /// Credit `recovered_days` from a passed recovery assessment.
    pub fn apply_recovery(
        &mut self,
        now: DateTime<Utc>,
        recovered_days: u32,
        assessment_id: impl Into<String>,
        objective_id: impl Into<String>,
    ) {
        self.current_streak = self.current_streak.saturating_add(recovered_days);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_study_date = now;
        self.missed_days = 0;
        self.updated_at = now;
        self.recovery_history.push(RecoveryHistoryEntry {
            date: now,
            recovered_days,
            assessment_id: assessment_id.into(),
            objective_id: objective_id.into(),
        });
    }
}
