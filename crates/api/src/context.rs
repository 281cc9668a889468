use homefix_core::ActorId;

/// Who is calling, taken from the `x-actor-id` header.
///
/// Authentication happens upstream; this layer only records the identity it
/// is handed. Requests without the header act as the system actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: ActorId,
}

impl ActorContext {
    pub fn new(actor: ActorId) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }
}
