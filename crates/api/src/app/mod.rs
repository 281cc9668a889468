//! HTTP wiring for the AI task layer.
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: error-to-response mapping

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use homefix_infra::AiServices;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (used by `main.rs` and the black-box tests).
pub fn build_app(services: AiServices) -> Router {
    let services = Arc::new(services);

    let actor_scoped = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(actor_scoped)
        .layer(ServiceBuilder::new())
}
