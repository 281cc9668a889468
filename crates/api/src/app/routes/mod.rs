use axum::Router;

pub mod admin;
pub mod feedback;
pub mod system;
pub mod tasks;

pub fn router() -> Router {
    Router::new()
        .nest("/ai", tasks::router().merge(feedback::router()))
        .nest("/admin", admin::router())
}
