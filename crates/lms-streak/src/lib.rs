//! Streak and recovery rules for the learning platform
//!
//! This crate holds the pure, storage-free part of the streak engine: calendar
//! day arithmetic, the active/broken streak recalculation, the recovery
//! question-count formula, assessment scoring and cooldown evaluation.
//! Everything here takes the current instant as an argument so that callers
//! (and tests) control time through a [`Clock`].

pub mod clock;
pub mod day;
pub mod recovery;
pub mod streak;

pub use clock::{Clock, ManualClock, SystemClock};
pub use day::{day_floor, days_between};
pub use recovery::{CooldownStatus, RecoveryLimits};
pub use streak::{RecoveryHistoryEntry, Streak, StreakState, StudyOutcome};
