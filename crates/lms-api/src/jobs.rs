//! Background jobs for periodic maintenance tasks.

use std::time::Duration;

use tokio::time::interval;

use crate::{config::RecoveryConfig, recovery::RecoveryService};

/// How often pending assessments are checked for expiry.
const EXPIRY_INTERVAL: Duration = Duration::from_secs(900);

/// Start all background jobs
///
/// Returns a vector of join handles that can be awaited on shutdown
pub fn start_background_jobs(
    recovery: RecoveryService,
    config: RecoveryConfig,
) -> Vec<tokio::task::JoinHandle<()>> {
    vec![tokio::spawn(periodic_assessment_expiry_job(recovery, config))]
}

/// Mark recovery assessments left pending past the expiry window as expired
async fn periodic_assessment_expiry_job(recovery: RecoveryService, config: RecoveryConfig) {
    let max_age = config.assessment_expiry();
    let mut interval = interval(EXPIRY_INTERVAL);

    loop {
        interval.tick().await;

        match recovery.expire_stale_assessments(max_age).await {
            Ok(expired) if expired > 0 => {
                tracing::info!(expired, "Assessment expiry complete");
            }
            Ok(_) => {
                tracing::debug!("Assessment expiry complete: nothing to expire");
            }
            Err(e) => {
                tracing::error!("Failed to expire stale recovery assessments: {e}");
            }
        }
    }
}
