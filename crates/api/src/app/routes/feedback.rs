use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use homefix_core::JobId;
use homefix_infra::ai::SubmitFeedback;
use homefix_infra::AiServices;

use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/feedback", post(submit_feedback))
        .route("/feedback/:job_id", get(list_feedback))
}

pub async fn submit_feedback(
    Extension(services): Extension<Arc<AiServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::FeedbackRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let job_id: JobId = match body.job_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let params = SubmitFeedback {
        job_id,
        actor: actor.actor().clone(),
        rating: body.rating,
        reason_code: body.reason_code,
        comment: body.comment,
        context_snapshot: body.context_snapshot,
    };

    match services.audit.submit_ai_feedback(params).await {
        Ok(feedback_id) => (StatusCode::CREATED, Json(dto::FeedbackCreated { feedback_id })).into_response(),
        Err(e) => errors::feedback_error_to_response(e),
    }
}

pub async fn list_feedback(
    Extension(services): Extension<Arc<AiServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let job_id: JobId = match job_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let items = match services.audit.feedback_for_job(job_id).await {
        Ok(items) => items,
        Err(e) => return errors::feedback_error_to_response(e),
    };
    let summary = homefix_infra::ai::FeedbackSummary::from_records(&items);

    (StatusCode::OK, Json(dto::FeedbackListResponse { job_id, summary, items })).into_response()
}
