//! Persistence/audit layer, feedback collector and batch runner for AI tasks.
//!
//! Nothing here is on the executor's path: callers persist explicitly after a
//! task returns, and a failed write never changes the returned result.

pub mod audit;
pub mod batch_runner;
pub mod feedback;
pub mod invocation;
pub mod postgres;

pub use audit::{AiAuditLog, AuditError, FeedbackError, SubmitFeedback};
pub use batch_runner::{BatchItem, BatchReport, BatchTaskRunner};
pub use feedback::{FeedbackRecord, FeedbackStore, FeedbackSummary, InMemoryFeedbackStore, Rating};
pub use invocation::{
    InMemoryTaskInvocationStore, InvocationQuery, StoreError, TaskInvocation, TaskInvocationStore,
};
pub use postgres::{PostgresFeedbackStore, PostgresTaskInvocationStore, run_migrations};
