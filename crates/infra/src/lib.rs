//! `homefix-infra`
//!
//! Adapters around the orchestration core: audit/feedback persistence,
//! Postgres flag storage, the HTTP model client, configuration and wiring.

pub mod ai;
pub mod config;
pub mod external;
pub mod flags;
pub mod services;

pub use config::AiConfig;
pub use services::AiServices;
