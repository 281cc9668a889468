use axum::{
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use homefix_core::ActorId;

use crate::app::errors::json_error;
use crate::context::ActorContext;

pub const ACTOR_HEADER: &str = "x-actor-id";

pub async fn actor_middleware(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let actor = match extract_actor(req.headers()) {
        Ok(actor) => actor,
        Err(msg) => {
            return json_error(axum::http::StatusCode::BAD_REQUEST, "invalid_actor", msg);
        }
    };

    req.extensions_mut().insert(ActorContext::new(actor));
    next.run(req).await
}

fn extract_actor(headers: &HeaderMap) -> Result<ActorId, String> {
    let Some(value) = headers.get(ACTOR_HEADER) else {
        return Ok(ActorId::system());
    };
    let value = value
        .to_str()
        .map_err(|_| format!("{ACTOR_HEADER} is not valid text"))?;
    ActorId::new(value).map_err(|e| e.to_string())
}
