//! Process-wide wiring of the orchestration layer.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use homefix_ai::{FeatureFlagGate, FlagSource, InMemoryFlagSource, ModelClient, TaskExecutor, UnconfiguredModelClient};

use crate::ai::{
    AiAuditLog, BatchTaskRunner, InMemoryFeedbackStore, InMemoryTaskInvocationStore,
    PostgresFeedbackStore, PostgresTaskInvocationStore, run_migrations,
};
use crate::config::AiConfig;
use crate::external::OpenAiModelClient;
use crate::flags::PostgresFlagSource;

/// Everything a route handler or batch job needs.
#[derive(Clone)]
pub struct AiServices {
    pub executor: Arc<TaskExecutor>,
    pub audit: AiAuditLog,
    pub flags: Arc<FeatureFlagGate>,
    pub config: AiConfig,
}

impl AiServices {
    /// Wire from configuration: Postgres when `DATABASE_URL` is set, otherwise
    /// in-memory stores; the HTTP model client when an API key is set.
    pub async fn from_config(config: AiConfig) -> Result<Self> {
        let model: Arc<dyn ModelClient> = match OpenAiModelClient::from_config(&config)
            .context("failed to build model client")?
        {
            Some(client) => {
                info!(model = client.model(), "model client configured");
                Arc::new(client)
            }
            None => {
                warn!("AI_MODEL_API_KEY not set; every task will use its fallback");
                Arc::new(UnconfiguredModelClient)
            }
        };

        let Some(database_url) = config.database_url.clone() else {
            info!("DATABASE_URL not set; using in-memory stores");
            return Ok(Self::in_memory(config, model, Arc::new(InMemoryFlagSource::new())));
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;
        run_migrations(&pool).await.context("failed to apply schema")?;
        info!("connected to Postgres");

        let flags = Arc::new(FeatureFlagGate::with_ttl(
            Arc::new(PostgresFlagSource::new(pool.clone())),
            config.flag_cache_ttl,
        ));
        let audit = AiAuditLog::new(
            Arc::new(PostgresTaskInvocationStore::new(pool.clone())),
            Arc::new(PostgresFeedbackStore::new(pool)),
        );
        Ok(Self::assemble(config, model, flags, audit))
    }

    /// In-memory stores around the given model client and flag source.
    pub fn in_memory(config: AiConfig, model: Arc<dyn ModelClient>, flag_source: Arc<dyn FlagSource>) -> Self {
        let flags = Arc::new(FeatureFlagGate::with_ttl(flag_source, config.flag_cache_ttl));
        let audit = AiAuditLog::new(InMemoryTaskInvocationStore::arc(), InMemoryFeedbackStore::arc());
        Self::assemble(config, model, flags, audit)
    }

    fn assemble(
        config: AiConfig,
        model: Arc<dyn ModelClient>,
        flags: Arc<FeatureFlagGate>,
        audit: AiAuditLog,
    ) -> Self {
        let executor = Arc::new(TaskExecutor::new(model, flags.clone()).with_config(config.executor_config()));
        Self {
            executor,
            audit,
            flags,
            config,
        }
    }

    pub fn batch_runner(&self) -> BatchTaskRunner {
        BatchTaskRunner::new(self.executor.clone(), self.audit.clone(), self.config.batch_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homefix_ai::{CapabilityGroup, TaskType};
    use homefix_core::ActorId;

    #[tokio::test]
    async fn in_memory_wiring_starts_with_everything_disabled() {
        let services = AiServices::from_config(AiConfig::default()).await.unwrap();
        for group in CapabilityGroup::ALL {
            assert!(!services.flags.is_capability_enabled(group).await);
        }
        assert_eq!(services.batch_runner().delay(), AiConfig::default().batch_delay);
    }

    #[tokio::test]
    async fn flag_flip_is_visible_to_the_executor() {
        let services = AiServices::from_config(AiConfig::default()).await.unwrap();
        services
            .flags
            .set_flag(TaskType::CrmNextBestAction.capability().flag_key(), true, &ActorId::system())
            .await
            .unwrap();
        assert!(
            services
                .executor
                .flags()
                .is_capability_enabled(CapabilityGroup::CrmCopilot)
                .await
        );
    }
}
