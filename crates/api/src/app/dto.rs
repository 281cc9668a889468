use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use homefix_ai::TaskEnvelope;
use homefix_core::{FeedbackId, JobId};
use homefix_infra::ai::{FeedbackRecord, FeedbackSummary};

#[derive(Debug, Deserialize)]
pub struct RunTaskRequest {
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default)]
    pub inputs: JsonValue,
    /// Write an invocation row after the run.
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Serialize)]
pub struct RunTaskResponse {
    #[serde(flatten)]
    pub envelope: TaskEnvelope<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

#[derive(Debug, Deserialize)]
pub struct FallbackRequest {
    #[serde(default)]
    pub inputs: JsonValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvocationsQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub task_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub job_id: String,
    pub rating: String,
    pub reason_code: Option<String>,
    pub comment: Option<String>,
    pub context_snapshot: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackCreated {
    pub feedback_id: FeedbackId,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub job_id: JobId,
    pub summary: FeedbackSummary,
    pub items: Vec<FeedbackRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SetFlagRequest {
    pub enabled: bool,
}

/// One row of the admin flag listing; groups without a stored record show as disabled.
#[derive(Debug, Serialize)]
pub struct FlagView {
    pub flag_key: String,
    pub enabled: bool,
    pub stored: bool,
    pub updated_by: Option<String>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub tasks: Vec<&'static str>,
}
