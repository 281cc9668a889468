//! Sequential batch execution for cron-style callers (e.g. nightly fraud review).
//!
//! Items run strictly one after another: run, persist (best effort), sleep.
//! There is no sleep after the last item. Concurrency across items is never
//! introduced so the model provider sees at most one request from a batch.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use homefix_ai::{AiError, RunTaskParams, TaskExecutor, TaskType};
use homefix_core::{ActorId, EntityRef, JobId};

use super::audit::AiAuditLog;

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub entity: EntityRef,
    pub inputs: JsonValue,
}

impl BatchItem {
    pub fn new(entity: EntityRef, inputs: JsonValue) -> Self {
        Self { entity, inputs }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub model_backed: usize,
    pub fallback: usize,
    pub persisted: usize,
    /// Entities whose inputs were rejected before execution.
    pub rejected: Vec<String>,
    pub job_ids: Vec<JobId>,
}

pub struct BatchTaskRunner {
    executor: Arc<TaskExecutor>,
    audit: AiAuditLog,
    delay: Duration,
    actor: ActorId,
}

impl BatchTaskRunner {
    pub fn new(executor: Arc<TaskExecutor>, audit: AiAuditLog, delay: Duration) -> Self {
        Self {
            executor,
            audit,
            delay,
            actor: ActorId::system(),
        }
    }

    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = actor;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task_type` over `items` in order.
    ///
    /// Invalid inputs are skipped and reported; nothing else stops the batch.
    pub async fn run(&self, task_type: TaskType, items: Vec<BatchItem>) -> BatchReport {
        let mut report = BatchReport {
            total: items.len(),
            ..BatchReport::default()
        };
        let last = items.len().saturating_sub(1);

        for (i, item) in items.into_iter().enumerate() {
            let params = RunTaskParams {
                task_type: task_type.as_str().to_string(),
                actor: self.actor.clone(),
                entity: item.entity.clone(),
                inputs: item.inputs.clone(),
            };

            match self.executor.run_task(params).await {
                Ok(envelope) => {
                    if envelope.used_fallback {
                        report.fallback += 1;
                    } else {
                        report.model_backed += 1;
                    }
                    if let Some(job_id) = self
                        .audit
                        .persist_best_effort(&self.actor, &item.entity, &item.inputs, &envelope)
                        .await
                    {
                        report.persisted += 1;
                        report.job_ids.push(job_id);
                    }
                }
                Err(AiError::InvalidInput(reason)) | Err(AiError::UnknownTaskType(reason)) => {
                    warn!(
                        task_type = %task_type,
                        entity = %item.entity,
                        error = %reason,
                        "batch item rejected"
                    );
                    report.rejected.push(item.entity.to_string());
                }
            }

            if i < last && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            task_type = %task_type,
            total = report.total,
            model_backed = report.model_backed,
            fallback = report.fallback,
            persisted = report.persisted,
            rejected = report.rejected.len(),
            "batch run finished"
        );
        report
    }
}
