use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use homefix_ai::{AiError, FlagSourceError};
use homefix_core::DomainError;
use homefix_infra::ai::{AuditError, FeedbackError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn ai_error_to_response(err: AiError) -> axum::response::Response {
    match err {
        AiError::UnknownTaskType(task_type) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_task_type",
            format!("unknown task type: {task_type}"),
        ),
        AiError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
}

pub fn audit_error_to_response(err: AuditError) -> axum::response::Response {
    tracing::error!(error = %err, "audit store failure");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn feedback_error_to_response(err: FeedbackError) -> axum::response::Response {
    match err {
        FeedbackError::NotFound(job_id) => json_error(
            StatusCode::NOT_FOUND,
            "job_not_found",
            format!("no task invocation with job id {job_id}"),
        ),
        FeedbackError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        FeedbackError::Store(e) => {
            tracing::error!(error = %e, "feedback store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn flag_error_to_response(err: FlagSourceError) -> axum::response::Response {
    match err {
        FlagSourceError::InvalidKey(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_flag_key", msg),
        FlagSourceError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "flag_store_unavailable", msg)
        }
    }
}

/// Map a JSON body rejection to the same `invalid_input` shape as other 400s.
pub fn json_rejection_to_response(rejection: axum::extract::rejection::JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", rejection.body_text())
}
