//! Task executor: the single entry point every AI call site goes through.
//!
//! Flow per invocation:
//! 1. resolve the task (unknown task types and malformed inputs are hard errors),
//! 2. mint a correlation id,
//! 3. consult the capability's feature flag,
//! 4. call the model under a per-attempt timeout, retrying transient failures,
//! 5. parse + validate the response,
//! 6. on any failure in 3-5 use the task's fallback.
//!
//! The executor never persists anything; callers decide whether to audit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{Instrument, info, info_span, warn};

use homefix_core::{ActorId, CorrelationId, EntityRef};

use crate::flags::FeatureFlagGate;
use crate::model::{ModelClient, ModelError, ModelRequest, extract_json};
use crate::registry::{TaskType, parse_input};
use crate::result::{AiError, FallbackReason, TaskEnvelope};
use crate::retry::RetryPolicy;
use crate::task::{AiTask, TaskRequest};
use crate::tasks::{
    CrmNextBestActionTask, FraudSignalTask, IntakeFollowupTask, InvoiceNarrativeTask,
    ProviderBriefTask, ProviderQualityTask, SponsorTileCopyTask,
};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound for a single model attempt.
    pub timeout: Duration,
    /// Applied to transient model failures only.
    pub retry: RetryPolicy,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            temperature: 0.2,
            max_tokens: 1200,
        }
    }
}

impl ExecutorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Untyped request for JSON callers (route handlers).
#[derive(Debug, Clone)]
pub struct RunTaskParams {
    pub task_type: String,
    pub actor: ActorId,
    pub entity: EntityRef,
    pub inputs: JsonValue,
}

pub struct TaskExecutor {
    model: Arc<dyn ModelClient>,
    flags: Arc<FeatureFlagGate>,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(model: Arc<dyn ModelClient>, flags: Arc<FeatureFlagGate>) -> Self {
        Self {
            model,
            flags,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn flags(&self) -> &Arc<FeatureFlagGate> {
        &self.flags
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a task with a typed input.
    ///
    /// Only fails when `check_input` rejects the input; every model-side failure
    /// is absorbed into a fallback envelope.
    pub async fn run<T: AiTask>(
        &self,
        request: &TaskRequest<T::Input>,
    ) -> Result<TaskEnvelope<T::Output>, AiError> {
        T::check_input(&request.input)?;

        let correlation_id = CorrelationId::new();
        let span = info_span!(
            "ai_task",
            task_type = %T::TASK_TYPE,
            correlation_id = %correlation_id,
            actor = %request.actor,
            entity = %request.entity,
        );

        Ok(self
            .execute::<T>(&request.input, correlation_id)
            .instrument(span)
            .await)
    }

    /// Run a task addressed by its wire key with a JSON input.
    pub async fn run_task(&self, params: RunTaskParams) -> Result<TaskEnvelope<JsonValue>, AiError> {
        let task_type: TaskType = params.task_type.parse()?;
        match task_type {
            TaskType::FraudSignalReferrals => self.run_json::<FraudSignalTask>(params).await,
            TaskType::ProviderQualitySummary => self.run_json::<ProviderQualityTask>(params).await,
            TaskType::CrmNextBestAction => self.run_json::<CrmNextBestActionTask>(params).await,
            TaskType::SponsorTileCopy => self.run_json::<SponsorTileCopyTask>(params).await,
            TaskType::IntakeFollowupQuestions => self.run_json::<IntakeFollowupTask>(params).await,
            TaskType::ProviderBriefGenerate => self.run_json::<ProviderBriefTask>(params).await,
            TaskType::InvoiceNarrative => self.run_json::<InvoiceNarrativeTask>(params).await,
        }
    }

    async fn run_json<T: AiTask>(
        &self,
        params: RunTaskParams,
    ) -> Result<TaskEnvelope<JsonValue>, AiError> {
        let input = parse_input::<T>(&params.inputs)?;
        let request = TaskRequest::new(params.actor, params.entity, input);
        Ok(self.run::<T>(&request).await?.into_json())
    }

    async fn execute<T: AiTask>(
        &self,
        input: &T::Input,
        correlation_id: CorrelationId,
    ) -> TaskEnvelope<T::Output> {
        let started_at = Utc::now();
        let flag_key = T::TASK_TYPE.capability().flag_key();

        let outcome = if self.flags.is_feature_enabled(flag_key).await {
            self.invoke_model::<T>(input, correlation_id).await
        } else {
            Err(FallbackReason::FlagDisabled(flag_key.to_string()))
        };

        let (output, fallback_reason) = match outcome {
            Ok(output) => (output, None),
            Err(reason) => (T::fallback(input), Some(reason)),
        };

        let envelope = TaskEnvelope {
            task_type: T::TASK_TYPE,
            success: true,
            used_fallback: fallback_reason.is_some(),
            output,
            correlation_id,
            fallback_reason,
            started_at,
            completed_at: Utc::now(),
        };

        info!(
            used_fallback = envelope.used_fallback,
            fallback_reason = envelope.fallback_reason.as_ref().map(FallbackReason::kind),
            duration_ms = envelope.duration_ms(),
            "ai task completed"
        );

        envelope
    }

    async fn invoke_model<T: AiTask>(
        &self,
        input: &T::Input,
        correlation_id: CorrelationId,
    ) -> Result<T::Output, FallbackReason> {
        let prompt = T::prompt(input);
        let request = ModelRequest {
            task_type: T::TASK_TYPE,
            correlation_id,
            system: prompt.system,
            user: prompt.user,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut attempts: u32 = 0;
        let raw = loop {
            attempts += 1;
            let result = match tokio::time::timeout(self.config.timeout, self.model.complete(&request)).await
            {
                Ok(r) => r,
                Err(_) => Err(ModelError::Timeout),
            };

            match result {
                Ok(raw) => break raw,
                Err(e) if e.is_transient() && self.config.retry.should_retry(attempts) => {
                    let delay = self.config.retry.delay_for_attempt(attempts);
                    warn!(
                        model = self.model.name(),
                        attempt = attempts,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "model call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        model = self.model.name(),
                        attempt = attempts,
                        error = %e,
                        "model call failed; using fallback"
                    );
                    return Err(match e {
                        ModelError::Timeout => FallbackReason::Timeout,
                        other => FallbackReason::ModelError(other.to_string()),
                    });
                }
            }
        };

        parse_output::<T>(&raw, input).inspect_err(|reason| {
            warn!(
                model = self.model.name(),
                reason = reason.kind(),
                detail = ?reason,
                "model output rejected; using fallback"
            );
        })
    }
}

impl core::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn parse_output<T: AiTask>(raw: &str, input: &T::Input) -> Result<T::Output, FallbackReason> {
    let json = extract_json(raw).ok_or_else(|| {
        FallbackReason::MalformedOutput("response contains no JSON object".to_string())
    })?;
    let parsed: T::Output =
        serde_json::from_str(json).map_err(|e| FallbackReason::MalformedOutput(e.to_string()))?;
    T::validate(parsed, input).map_err(|e| FallbackReason::ValidationFailed(e.0))
}
