//! Persistence/audit layer and feedback collector.
//!
//! Persistence is an explicit step after a task finishes; the executor never
//! writes. A failed write never invalidates the result the caller already has.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info};

use homefix_ai::{TaskEnvelope, TaskType};
use homefix_core::{ActorId, EntityRef, FeedbackId, JobId};

use super::feedback::{FeedbackRecord, FeedbackStore, FeedbackSummary, Rating};
use super::invocation::{InvocationQuery, StoreError, TaskInvocation, TaskInvocationStore};

pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_REASON_CODE_CHARS: usize = 64;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("task output could not be serialized: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("task invocation not found: {0}")]
    NotFound(JobId),

    #[error("invalid feedback: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Feedback as submitted by a route handler; the rating is still raw text.
#[derive(Debug, Clone)]
pub struct SubmitFeedback {
    pub job_id: JobId,
    pub actor: ActorId,
    pub rating: String,
    pub reason_code: Option<String>,
    pub comment: Option<String>,
    pub context_snapshot: Option<JsonValue>,
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AiAuditLog {
    invocations: Arc<dyn TaskInvocationStore>,
    feedback: Arc<dyn FeedbackStore>,
}

impl AiAuditLog {
    pub fn new(invocations: Arc<dyn TaskInvocationStore>, feedback: Arc<dyn FeedbackStore>) -> Self {
        Self {
            invocations,
            feedback,
        }
    }

    /// Write one invocation row for a finished task and return its job id.
    pub async fn persist_ai_task_response<O: Serialize>(
        &self,
        actor: &ActorId,
        entity: &EntityRef,
        inputs: &JsonValue,
        response: &TaskEnvelope<O>,
    ) -> Result<JobId, AuditError> {
        let invocation =
            TaskInvocation::from_envelope(actor.clone(), entity.clone(), inputs.clone(), response)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
        let job_id = self.invocations.insert(invocation).await?;

        info!(
            job_id = %job_id,
            task_type = %response.task_type,
            correlation_id = %response.correlation_id,
            used_fallback = response.used_fallback,
            entity = %entity,
            "ai task response persisted"
        );
        Ok(job_id)
    }

    /// Like [`Self::persist_ai_task_response`] but logs failures instead of returning them.
    pub async fn persist_best_effort<O: Serialize>(
        &self,
        actor: &ActorId,
        entity: &EntityRef,
        inputs: &JsonValue,
        response: &TaskEnvelope<O>,
    ) -> Option<JobId> {
        match self
            .persist_ai_task_response(actor, entity, inputs, response)
            .await
        {
            Ok(job_id) => Some(job_id),
            Err(e) => {
                error!(
                    task_type = %response.task_type,
                    correlation_id = %response.correlation_id,
                    entity = %entity,
                    error = %e,
                    "failed to persist ai task response"
                );
                None
            }
        }
    }

    pub async fn get_invocation(&self, job_id: JobId) -> Result<Option<TaskInvocation>, AuditError> {
        Ok(self.invocations.get(job_id).await?)
    }

    /// Invocations for one entity, newest first.
    pub async fn get_task_invocations_for_entity(
        &self,
        entity: &EntityRef,
        task_type: Option<TaskType>,
        limit: usize,
    ) -> Result<Vec<TaskInvocation>, AuditError> {
        let query = InvocationQuery::for_entity(entity)
            .with_task_type(task_type)
            .with_limit(limit);
        self.query_invocations(&query).await
    }

    pub async fn query_invocations(
        &self,
        query: &InvocationQuery,
    ) -> Result<Vec<TaskInvocation>, AuditError> {
        Ok(self.invocations.query(query).await?)
    }

    /// The most recent insight for an entity, e.g. for an admin detail page.
    pub async fn latest_for_entity(
        &self,
        entity: &EntityRef,
        task_type: TaskType,
    ) -> Result<Option<TaskInvocation>, AuditError> {
        Ok(self
            .get_task_invocations_for_entity(entity, Some(task_type), 1)
            .await?
            .into_iter()
            .next())
    }

    /// Record one human judgment. Repeated feedback on a job accumulates.
    pub async fn submit_ai_feedback(&self, params: SubmitFeedback) -> Result<FeedbackId, FeedbackError> {
        let rating: Rating = params.rating.parse().map_err(FeedbackError::InvalidInput)?;

        let comment = optional_text(params.comment);
        if let Some(c) = &comment {
            if c.chars().count() > MAX_COMMENT_CHARS {
                return Err(FeedbackError::InvalidInput(format!(
                    "comment longer than {MAX_COMMENT_CHARS} characters"
                )));
            }
        }
        let reason_code = optional_text(params.reason_code);
        if let Some(r) = &reason_code {
            if r.chars().count() > MAX_REASON_CODE_CHARS {
                return Err(FeedbackError::InvalidInput(format!(
                    "reason_code longer than {MAX_REASON_CODE_CHARS} characters"
                )));
            }
        }

        if self.invocations.get(params.job_id).await?.is_none() {
            return Err(FeedbackError::NotFound(params.job_id));
        }

        let record = FeedbackRecord {
            feedback_id: FeedbackId::new(),
            job_id: params.job_id,
            actor: params.actor,
            rating,
            reason_code,
            comment,
            context_snapshot: params.context_snapshot,
            created_at: Utc::now(),
        };
        let feedback_id = self.feedback.insert(record).await?;

        info!(
            feedback_id = %feedback_id,
            job_id = %params.job_id,
            rating = rating.as_str(),
            "ai feedback recorded"
        );
        Ok(feedback_id)
    }

    pub async fn feedback_for_job(&self, job_id: JobId) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        Ok(self.feedback.list_for_job(job_id).await?)
    }

    pub async fn feedback_summary(&self, job_id: JobId) -> Result<FeedbackSummary, FeedbackError> {
        let records = self.feedback_for_job(job_id).await?;
        Ok(FeedbackSummary::from_records(&records))
    }
}
