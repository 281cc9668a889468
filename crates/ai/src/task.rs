use serde::Serialize;
use serde::de::DeserializeOwned;

use homefix_core::{ActorId, EntityRef};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};

/// Contract of one AI capability.
///
/// Implementors are zero-sized markers; everything is an associated item so the
/// executor can be monomorphised per task and unknown tasks cannot be expressed.
pub trait AiTask: Send + Sync + 'static {
    type Input: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Output: Serialize + DeserializeOwned + Send + Sync + 'static;

    const TASK_TYPE: TaskType;

    /// Reject inputs the caller should never have built.
    ///
    /// Anything accepted here must be accepted by [`AiTask::fallback`].
    fn check_input(_input: &Self::Input) -> Result<(), AiError> {
        Ok(())
    }

    fn prompt(input: &Self::Input) -> Prompt;

    /// Rule-based output. Pure, deterministic and total over checked inputs.
    fn fallback(input: &Self::Input) -> Self::Output;

    /// Validate a parsed model output, repairing what is derivable from the input.
    fn validate(output: Self::Output, input: &Self::Input) -> Result<Self::Output, ValidationError>;
}

/// System + user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Build a JSON-only prompt: instructions, the expected output shape and the input.
    pub fn json_task(role: &str, instructions: &str, output_shape: &str, input: &impl Serialize) -> Self {
        let input_json = serde_json::to_string_pretty(input).unwrap_or_else(|_| "{}".to_string());
        Self {
            system: format!(
                "{role} Respond with a single JSON object and nothing else. \
                 Do not wrap it in markdown. Never invent facts that are not in the input."
            ),
            user: format!(
                "{instructions}\n\nOutput JSON shape:\n{output_shape}\n\nInput:\n{input_json}"
            ),
        }
    }
}

/// Typed request for [`crate::TaskExecutor::run`].
#[derive(Debug, Clone)]
pub struct TaskRequest<I> {
    pub actor: ActorId,
    pub entity: EntityRef,
    pub input: I,
}

impl<I> TaskRequest<I> {
    pub fn new(actor: ActorId, entity: EntityRef, input: I) -> Self {
        Self {
            actor,
            entity,
            input,
        }
    }

    pub fn system(entity: EntityRef, input: I) -> Self {
        Self::new(ActorId::system(), entity, input)
    }
}
