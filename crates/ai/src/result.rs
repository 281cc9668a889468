use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use homefix_core::CorrelationId;

use crate::registry::TaskType;

/// Uniform result of one task execution.
///
/// Model-backed and fallback output have the same shape; only `used_fallback`
/// (and `fallback_reason`) tell them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope<O> {
    pub task_type: TaskType,

    /// `false` only when not even the fallback could produce an output.
    pub success: bool,

    pub used_fallback: bool,

    pub output: O,

    pub correlation_id: CorrelationId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl<O> TaskEnvelope<O> {
    pub fn duration_ms(&self) -> u64 {
        (self.completed_at - self.started_at).num_milliseconds().max(0) as u64
    }

    /// `true` when the output came from the external model.
    pub fn is_model_backed(&self) -> bool {
        self.success && !self.used_fallback
    }
}

impl<O: Serialize> TaskEnvelope<O> {
    /// Erase the output type for JSON callers and persistence.
    ///
    /// A serialization failure yields `success = false` with a null output; the
    /// typed envelope is otherwise carried over unchanged.
    pub fn into_json(self) -> TaskEnvelope<JsonValue> {
        let (success, output) = match serde_json::to_value(&self.output) {
            Ok(v) => (self.success, v),
            Err(e) => {
                tracing::error!(
                    task_type = %self.task_type,
                    correlation_id = %self.correlation_id,
                    error = %e,
                    "task output could not be serialized"
                );
                (false, JsonValue::Null)
            }
        };

        TaskEnvelope {
            task_type: self.task_type,
            success,
            used_fallback: self.used_fallback,
            output,
            correlation_id: self.correlation_id,
            fallback_reason: self.fallback_reason,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Why the fallback output was used instead of the model's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    FlagDisabled(String),
    Timeout,
    ModelError(String),
    MalformedOutput(String),
    ValidationFailed(String),
}

impl FallbackReason {
    pub fn kind(&self) -> &'static str {
        match self {
            FallbackReason::FlagDisabled(_) => "flag_disabled",
            FallbackReason::Timeout => "timeout",
            FallbackReason::ModelError(_) => "model_error",
            FallbackReason::MalformedOutput(_) => "malformed_output",
            FallbackReason::ValidationFailed(_) => "validation_failed",
        }
    }
}

/// Errors that propagate to the caller instead of degrading to a fallback.
///
/// Both variants are caller/configuration mistakes, never model failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("invalid task input: {0}")]
    InvalidInput(String),
}

impl AiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Model output failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
