//! `homefix-ai`
//!
//! **Responsibility:** the AI task orchestration layer.
//!
//! Every generative-AI call site in the marketplace goes through [`TaskExecutor`]:
//! - tasks are a closed set ([`TaskType`]) resolved through a static registry,
//! - each task owns a pure, deterministic fallback that produces the same output shape,
//! - model output is never trusted: it is parsed and validated, and replaced by the
//!   fallback on any failure,
//! - capabilities are switched by cached feature flags that default to off.
//!
//! Persistence and feedback live in `homefix-infra`; this crate does no I/O of its
//! own beyond the injected [`ModelClient`] and [`FlagSource`].

pub mod executor;
pub mod flags;
pub mod model;
pub mod registry;
pub mod result;
pub mod retry;
pub mod task;
pub mod tasks;

pub use executor::{ExecutorConfig, RunTaskParams, TaskExecutor};
pub use flags::{FeatureFlag, FeatureFlagGate, FlagSource, FlagSourceError, InMemoryFlagSource};
pub use model::{ModelClient, ModelError, ModelRequest, UnconfiguredModelClient};
pub use registry::{CapabilityGroup, TaskDefinition, TaskType, get_task_definition};
pub use result::{AiError, FallbackReason, TaskEnvelope, ValidationError};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use task::{AiTask, Prompt, TaskRequest};
