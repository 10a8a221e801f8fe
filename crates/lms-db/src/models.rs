use chrono::{DateTime, Utc};
use lms_streak::{RecoveryHistoryEntry, Streak};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timestamp::{StoreTimestamp, store_format};

/// Collection holding one streak per user, keyed by user id.
pub const STREAKS: &str = "streaks";
/// Collection holding recovery assessments, keyed by generated id.
pub const RECOVERY_ASSESSMENTS: &str = "recoveryAssessments";
/// Collection holding learning objectives.
pub const LEARNING_OBJECTIVES: &str = "learningObjectives";

/// Persisted form of a [`Streak`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakDocument {
    pub user_id: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    pub last_study_date: StoreTimestamp,
    #[serde(default)]
    pub missed_days: u32,
    #[serde(default)]
    pub recovery_history: Vec<RecoveryHistoryDocument>,
    pub updated_at: StoreTimestamp,
}

/// Persisted form of a [`RecoveryHistoryEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryHistoryDocument {
    pub date: StoreTimestamp,
    pub recovered_days: u32,
    pub assessment_id: String,
    pub objective_id: String,
}

impl From<&Streak> for StreakDocument {
    fn from(streak: &Streak) -> Self {
        Self {
            user_id: streak.user_id.clone(),
            current_streak: streak.current_streak,
            longest_streak: streak.longest_streak,
            last_study_date: streak.last_study_date.into(),
            missed_days: streak.missed_days,
            recovery_history: streak
                .recovery_history
                .iter()
                .map(|entry| RecoveryHistoryDocument {
                    date: entry.date.into(),
                    recovered_days: entry.recovered_days,
                    assessment_id: entry.assessment_id.clone(),
                    objective_id: entry.objective_id.clone(),
                })
                .collect(),
            updated_at: streak.updated_at.into(),
        }
    }
}

impl From<StreakDocument> for Streak {
    fn from(doc: StreakDocument) -> Self {
        Self {
            user_id: doc.user_id,
            current_streak: doc.current_streak,
            longest_streak: doc.longest_streak,
            last_study_date: doc.last_study_date.into(),
            missed_days: doc.missed_days,
            recovery_history: doc
                .recovery_history
                .into_iter()
                .map(|entry| RecoveryHistoryEntry {
                    date: entry.date.into(),
                    recovered_days: entry.recovered_days,
                    assessment_id: entry.assessment_id,
                    objective_id: entry.objective_id,
                })
                .collect(),
            updated_at: doc.updated_at.into(),
        }
    }
}

/// Lifecycle of a recovery assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Pending,
    Completed,
    /// Left pending past the expiry window.
    Expired,
    /// Any status string this version does not know about.
    #[serde(other)]
    Unknown,
}

impl AssessmentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }

    /// Whether an attempt in this status counts against the cooldown.
    pub const fn counts_for_cooldown(&self) -> bool {
        matches!(self, Self::Pending | Self::Completed)
    }
}

/// An answer, either an option index or free text.
///
/// Comparison is strict: the index `1` and the text `"1"` are different answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Index(i64),
    Text(String),
}

impl AnswerValue {
    /// Normalize a submitted answer. Integers stay indices, anything else is
    /// coerced to its text form.
    pub fn from_submitted(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(index) => Self::Index(index),
                None => Self::Text(n.to_string()),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A generated quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: AnswerValue,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: String,
}

/// A recovery assessment as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAssessment {
    pub id: String,
    pub user_id: String,
    pub objective_id: String,
    pub objective_title: String,
    /// Recoverable (already capped) day count credited on pass.
    pub missed_days: u32,
    pub question_count: u32,
    pub questions: Vec<QuizQuestion>,
    pub status: AssessmentStatus,
    #[serde(with = "store_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "store_format::option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovered_days: Option<u32>,
}

/// A learning objective, as far as recovery needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningObjective {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// What the question generator is told about an objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveProfile {
    pub objective_id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<String>,
    pub topics: Vec<String>,
}

impl LearningObjective {
    pub fn profile(&self) -> ObjectiveProfile {
        ObjectiveProfile {
            objective_id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            skill_level: self.skill_level.clone(),
            topics: self.topics.clone(),
        }
    }
}
