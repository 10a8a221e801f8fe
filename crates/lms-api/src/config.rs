//! Runtime configuration, read from environment variables.
//!
//! [`ApiConfig`] covers the server itself and fails loudly on malformed
//! input. [`RecoveryConfig`] covers the recovery tunables and never fails:
//! a missing, malformed or out-of-range value falls back to its default.

use std::ops::RangeInclusive;

use chrono::Duration;
use lms_streak::RecoveryLimits;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}

/// Deployment environment, selects log format and security headers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        *self == Self::Development
    }

    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

const fn default_db_max_connections() -> u32 {
    10
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    /// Postgres URL. Without it the service keeps documents in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub env: Environment,
    /// Comma-separated list of origins allowed by CORS.
    #[serde(default)]
    pub allowed_origins: Option<String>,
    #[serde(default)]
    pub question_generator_url: Option<String>,
    #[serde(default)]
    pub question_generator_api_key: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(skip)]
    pub recovery: RecoveryConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_pairs(std::env::vars().collect())
    }

    /// Build from explicit key/value pairs, as read from the environment.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ConfigError> {
        let mut config: Self = envy::from_iter(pairs.iter().cloned())?;
        config.recovery = RecoveryConfig::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| k.as_str() == key)
                .map(|(_, v)| v.clone())
        });
        Ok(config)
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Recovery tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryConfig {
    pub max_recovery_days: u32,
    pub questions_per_day: u32,
    pub max_questions: u32,
    pub cooldown_hours: u32,
    /// Radix used to parse the other integer settings.
    pub parse_int_base: u32,
    /// Pending assessments older than this are marked expired.
    pub assessment_expiry_hours: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_recovery_days: 7,
            questions_per_day: 10,
            max_questions: 30,
            cooldown_hours: 1,
            parse_int_base: 10,
            assessment_expiry_hours: 24,
        }
    }
}

impl RecoveryConfig {
    /// Read every recovery setting through `lookup`, falling back per key.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_int_base = parse_setting(
            &lookup,
            "RECOVERY_PARSE_INT_BASE",
            10,
            2..=36,
            defaults.parse_int_base,
        );
        let read = |key: &str, range: RangeInclusive<u32>, default: u32| {
            parse_setting(&lookup, key, parse_int_base, range, default)
        };

        Self {
            max_recovery_days: read("RECOVERY_MAX_DAYS", 1..=365, defaults.max_recovery_days),
            questions_per_day: read(
                "RECOVERY_QUESTIONS_PER_DAY",
                1..=100,
                defaults.questions_per_day,
            ),
            max_questions: read("RECOVERY_MAX_QUESTIONS", 1..=500, defaults.max_questions),
            cooldown_hours: read("RECOVERY_COOLDOWN_HOURS", 0..=720, defaults.cooldown_hours),
            parse_int_base,
            assessment_expiry_hours: read(
                "RECOVERY_ASSESSMENT_EXPIRY_HOURS",
                1..=720,
                defaults.assessment_expiry_hours,
            ),
        }
    }

    pub fn limits(&self) -> RecoveryLimits {
        RecoveryLimits {
            max_recovery_days: self.max_recovery_days,
            questions_per_day: self.questions_per_day,
            max_questions: self.max_questions,
            cooldown: Duration::hours(i64::from(self.cooldown_hours)),
        }
    }

    pub fn assessment_expiry(&self) -> Duration {
        Duration::hours(i64::from(self.assessment_expiry_hours))
    }
}

fn parse_setting<F>(
    lookup: &F,
    key: &str,
    radix: u32,
    range: RangeInclusive<u32>,
    default: u32,
) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match u32::from_str_radix(raw.trim(), radix) {
        Ok(value) if range.contains(&value) => value,
        _ => {
            tracing::warn!(
                key,
                value = %raw,
                default,
                "Invalid recovery setting, falling back to default"
            );
            default
        }
    }
}
