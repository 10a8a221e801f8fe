//! Recovery rules: how many days can be won back, how many questions that
//! costs, how an attempt is scored, and how often it may be tried.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Minimum score (percent) for a recovery assessment to pass.
pub const PASSING_SCORE: f64 = 70.0;

/// A passing attempt averaging less than this per question gets flagged.
pub const SUSPICIOUS_SECONDS_PER_QUESTION: f64 = 5.0;

/// Tunables for recovery assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryLimits {
    /// Upper bound on days a single recovery can restore.
    pub max_recovery_days: u32,
    /// Questions asked per recoverable day.
    pub questions_per_day: u32,
    /// Hard cap on the size of one assessment.
    pub max_questions: u32,
    /// Minimum spacing between two attempts on the same objective.
    pub cooldown: Duration,
}

impl Default for RecoveryLimits {
    fn default() -> Self {
        Self {
            max_recovery_days: 7,
            questions_per_day: 10,
            max_questions: 30,
            cooldown: Duration::hours(1),
        }
    }
}

impl RecoveryLimits {
    /// Missed days capped at [`Self::max_recovery_days`].
    pub fn recoverable_days(&self, missed_days: u32) -> u32 {
        missed_days.min(self.max_recovery_days)
    }

    /// Number of questions in a recovery assessment for `missed_days`.
    ///
    /// # Examples
    /// ```
    /// use lms_streak::RecoveryLimits;
    ///
    /// let limits = RecoveryLimits::default();
    /// assert_eq!(limits.question_count(0), 0);
    /// assert_eq!(limits.question_count(2), 20);
    /// assert_eq!(limits.question_count(10), 30);
    /// ```
    pub fn question_count(&self, missed_days: u32) -> u32 {
        self.recoverable_days(missed_days)
            .saturating_mul(self.questions_per_day)
            .min(self.max_questions)
    }
}

/// Percentage of correct answers. An empty assessment scores 0.
pub fn score(correct_answers: u32, total_questions: u32) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    f64::from(correct_answers) / f64::from(total_questions) * 100.0
}

/// Whether `score` reaches [`PASSING_SCORE`].
pub fn passes(score: f64) -> bool {
    score >= PASSING_SCORE
}

/// Seconds spent per question, when a positive total time was reported.
pub fn average_time_per_question(time_spent_secs: Option<f64>, total_questions: u32) -> Option<f64> {
    match time_spent_secs {
        Some(spent) if spent > 0.0 && total_questions > 0 => Some(spent / f64::from(total_questions)),
        _ => None,
    }
}

/// Heuristic for implausibly fast passing attempts. Only ever a warning.
pub fn is_suspicious(passed: bool, average_time_per_question: Option<f64>) -> bool {
    passed && average_time_per_question.is_some_and(|avg| avg < SUSPICIOUS_SECONDS_PER_QUESTION)
}

/// Outcome of checking prior attempts against the cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
    pub can_attempt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_ends_at: Option<DateTime<Utc>>,
}

impl CooldownStatus {
    pub const fn clear() -> Self {
        Self {
            can_attempt: true,
            cooldown_ends_at: None,
        }
    }

    pub const fn blocked_until(cooldown_ends_at: DateTime<Utc>) -> Self {
        Self {
            can_attempt: false,
            cooldown_ends_at: Some(cooldown_ends_at),
        }
    }
}

/// Decide whether a new attempt may start, given the creation instants of the
/// prior attempts that still count.
///
/// Only the most recent attempt matters; the window is derived from it
/// regardless of the order the attempts come in.
pub fn evaluate_cooldown<I>(attempts: I, now: DateTime<Utc>, cooldown: Duration) -> CooldownStatus
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let Some(latest) = attempts.into_iter().max() else {
        return CooldownStatus::clear();
    };

    if latest > now - cooldown {
        CooldownStatus::blocked_until(latest + cooldown)
    } else {
        CooldownStatus::clear()
    }
}

/// Human-readable wait time, e.g. `"45 minutes"` or `"1 hour and 5 minutes"`.
///
/// Partial minutes round up, so a few seconds left still reads as one minute.
pub fn format_remaining(remaining: Duration) -> String {
    let millis = remaining.num_milliseconds().max(0);
    let minutes = (millis + 59_999) / 60_000;

    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        plural(hours, "hour")
    } else {
        format!("{} and {}", plural(hours, "hour"), plural(rest, "minute"))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
