use chrono::{DateTime, Utc};
use serde::Serialize;

/// Missed days as of now, for deciding whether to offer a recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedDays {
    pub missed_days: u32,
    pub last_study_date: DateTime<Utc>,
}
