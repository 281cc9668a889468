//! Outbound integrations.

pub mod openai;

pub use openai::OpenAiModelClient;
