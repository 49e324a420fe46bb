use rewind_core::BoxError;
use serde::de::DeserializeOwned;

/// Why the log is being rewound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewindMode {
    /// Ordinary undo or rollback of a failed action.
    #[default]
    Undo,
    /// History is being discarded; the rewound region will never be redone.
    Permanent,
}

impl RewindMode {
    #[must_use]
    pub fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// Reverses one class of mutation, given the payload recorded for it.
///
/// The payload is stored as JSON and decoded into `Payload` before
/// `compensate` is called, so an applier and its compensator only have to
/// agree on a serde type.
///
/// # Type Parameters
///
/// - `Context`: the state owners the compensator mutates
/// - `Payload`: data recorded by the applier when it made the mutation
pub trait Compensator: Send + Sync {
    /// State owners the compensator mutates.
    type Context;

    /// Data recorded by the applier alongside the mutation.
    type Payload: DeserializeOwned;

    /// Reverse the mutation described by `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation cannot be reversed. This is fatal for
    /// the engine: the log stops rewinding and is left partially rewound.
    fn compensate(
        &self,
        ctx: &Self::Context,
        payload: Self::Payload,
        mode: RewindMode,
    ) -> Result<(), BoxError>;

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self, name: &str) -> String {
        format!("reverse {name}")
    }
}
