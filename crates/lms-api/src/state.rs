use std::sync::Arc;

use lms_db::{DocumentStore, MemoryStore, PgDocumentStore};
use lms_streak::{Clock, SystemClock};

use crate::{
    ApiConfig,
    config::{Environment, RecoveryConfig},
    recovery::{
        RecoveryService,
        generator::{DisabledQuestionGenerator, HttpQuestionGenerator, QuestionGenerator},
    },
    streak::StreakService,
};

#[derive(Clone, Debug)]
pub struct ApiState {
    pub streaks: StreakService,
    pub recovery: RecoveryService,
    pub recovery_config: RecoveryConfig,
    pub environment: Environment,
}

impl ApiState {
    /// Wire services around an already constructed store, generator and clock.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn QuestionGenerator>,
        clock: Arc<dyn Clock>,
        recovery_config: RecoveryConfig,
        environment: Environment,
    ) -> Self {
        let streaks = StreakService::new(store.clone(), clock.clone());
        let recovery = RecoveryService::new(
            store,
            generator,
            clock,
            recovery_config.limits(),
            streaks.clone(),
        );

        Self {
            streaks,
            recovery,
            recovery_config,
            environment,
        }
    }

    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => {
                let pool = lms_db::create_pool(url, config.db_max_connections).await?;
                lms_db::ensure_db_and_migrate(url, &pool).await?;
                tracing::info!("Using Postgres document store");
                Arc::new(PgDocumentStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, documents are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let generator: Arc<dyn QuestionGenerator> = match &config.question_generator_url {
            Some(url) => Arc::new(HttpQuestionGenerator::new(
                url.clone(),
                config.question_generator_api_key.clone(),
            )),
            None => {
                tracing::warn!("Question generator not configured (missing QUESTION_GENERATOR_URL)");
                Arc::new(DisabledQuestionGenerator)
            }
        };

        Ok(Self::new(
            store,
            generator,
            Arc::new(SystemClock),
            config.recovery,
            config.env.clone(),
        ))
    }
}
