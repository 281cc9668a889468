use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use homefix_ai::{get_task_definition, AiError, RunTaskParams, TaskType};
use homefix_core::{EntityRef, EntityType};
use homefix_infra::ai::InvocationQuery;
use homefix_infra::AiServices;

use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/tasks/:task_type/run", post(run_task))
        .route("/tasks/:task_type/fallback", post(fallback))
        .route("/invocations", get(list_invocations))
}

pub async fn run_task(
    Extension(services): Extension<Arc<AiServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(task_type): Path<String>,
    body: Result<Json<dto::RunTaskRequest>, JsonRejection>,
) -> axum::response::Response {
    // Unknown task types are a 404 even when the body is also malformed.
    if get_task_definition(&task_type).is_none() {
        return errors::ai_error_to_response(AiError::UnknownTaskType(task_type));
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let entity = match parse_entity(&body.entity_type, &body.entity_id) {
        Ok(entity) => entity,
        Err(resp) => return resp,
    };

    let params = RunTaskParams {
        task_type,
        actor: actor.actor().clone(),
        entity: entity.clone(),
        inputs: body.inputs.clone(),
    };

    let envelope = match services.executor.run_task(params).await {
        Ok(envelope) => envelope,
        Err(e) => return errors::ai_error_to_response(e),
    };

    let job_id = if body.persist {
        services
            .audit
            .persist_best_effort(actor.actor(), &entity, &body.inputs, &envelope)
            .await
    } else {
        None
    };

    (StatusCode::OK, Json(dto::RunTaskResponse { envelope, job_id })).into_response()
}

pub async fn fallback(
    Path(task_type): Path<String>,
    body: Result<Json<dto::FallbackRequest>, JsonRejection>,
) -> axum::response::Response {
    let Some(definition) = get_task_definition(&task_type) else {
        return errors::ai_error_to_response(AiError::UnknownTaskType(task_type));
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match definition.fallback(&body.inputs) {
        Ok(output) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "task_type": definition.task_type,
                "used_fallback": true,
                "output": output,
            })),
        )
            .into_response(),
        Err(e) => errors::ai_error_to_response(e),
    }
}

pub async fn list_invocations(
    Extension(services): Extension<Arc<AiServices>>,
    Query(params): Query<dto::InvocationsQuery>,
) -> axum::response::Response {
    let entity_type = match params.entity_type.as_deref().map(str::parse::<EntityType>).transpose() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let task_type = match params.task_type.as_deref().map(str::parse::<TaskType>).transpose() {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", e.to_string());
        }
    };

    let query = InvocationQuery {
        entity_type,
        entity_id: params.entity_id.filter(|id| !id.trim().is_empty()),
        task_type,
        limit: params.limit,
    };

    match services.audit.query_invocations(&query).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::audit_error_to_response(e),
    }
}

fn parse_entity(entity_type: &str, entity_id: &str) -> Result<EntityRef, axum::response::Response> {
    let entity_type: EntityType = entity_type
        .parse()
        .map_err(errors::domain_error_to_response)?;
    EntityRef::new(entity_type, entity_id).map_err(errors::domain_error_to_response)
}
