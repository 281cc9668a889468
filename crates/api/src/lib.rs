//! HTTP adapter over the AI task orchestration layer.

pub mod app;
pub mod context;
pub mod middleware;
