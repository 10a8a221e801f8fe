//! Log subscriber setup.
//!
//! Development gets pretty multi-line events with source locations. Production
//! emits one flattened JSON object per event, so the `user_id`,
//! `objective_id` and `assessment_id` fields the services attach can be
//! queried directly. `RUST_LOG` overrides the default directives in both.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

/// How events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl From<&Environment> for LogFormat {
    fn from(env: &Environment) -> Self {
        match env {
            Environment::Development => Self::Pretty,
            Environment::Production => Self::Json,
        }
    }
}

/// Default directives. The engine crates are noisier than their dependencies.
pub fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Development => "info,lms_api=debug,lms_db=debug,serv=debug,tower_http=debug,sqlx=warn",
        Environment::Production => "info,tower_http=info,sqlx=warn,reqwest=warn",
    }
}

/// Parse `rust_log` if given, falling back to the defaults for `env`.
///
/// Returns the filter and the rejected directive string, if any, so it can be
/// reported once a subscriber exists.
fn resolve_filter(env: &Environment, rust_log: Option<&str>) -> (EnvFilter, Option<String>) {
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, None),
            Err(_) => (
                EnvFilter::new(default_directives(env)),
                Some(directives.to_string()),
            ),
        },
        None => (EnvFilter::new(default_directives(env)), None),
    }
}

/// Install the global subscriber for `env`.
pub fn init_tracing(env: &Environment) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, rejected) = resolve_filter(env, rust_log.as_deref());
    let format = LogFormat::from(env);

    let layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };
    tracing_subscriber::registry().with(layer).init();

    if let Some(rejected) = rejected {
        tracing::warn!(rust_log = %rejected, "Ignoring invalid RUST_LOG, using defaults");
    }
    tracing::info!(?format, "Tracing initialized");
}
