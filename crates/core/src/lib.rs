//! `homefix-core`: shared building blocks for the marketplace services.
//!
//! Pure types only (no I/O): identifiers, entity references, and the domain error model.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{EntityRef, EntityType};
pub use error::{DomainError, DomainResult};
pub use id::{ActorId, CorrelationId, FeedbackId, JobId};
