pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod recovery;
pub mod router;
pub mod state;
pub mod streak;
pub mod tracing;

pub use config::ApiConfig;
pub use state::ApiState;
