use std::sync::Arc;

use indexmap::IndexMap;
use rewind_core::{Action, CompensationRecord, Mark};
use rewind_log::CompensationWriter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::error::{ActionError, Result};

/// How an applier is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Perform the mutation and record its compensation.
    Apply,
    /// Run every check a real application would, but mutate nothing.
    ValidateOnly,
}

/// Performs (or validates) the mutation for one action type.
///
/// When the scope is in [`ApplyMode::ValidateOnly`] an applier must make no
/// externally observable change. Recording a compensation is refused in that
/// mode; leaving owned state untouched is the applier's own obligation.
pub trait Applier<Ctx>: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the action is invalid or cannot be applied.
    fn apply(&self, scope: &mut ApplyScope<'_, Ctx>, action: &Action) -> Result<Value>;
}

impl<Ctx, F> Applier<Ctx> for F
where
    F: Fn(&mut ApplyScope<'_, Ctx>, &Action) -> Result<Value> + Send + Sync,
{
    fn apply(&self, scope: &mut ApplyScope<'_, Ctx>, action: &Action) -> Result<Value> {
        self(scope, action)
    }
}

pub(crate) type ApplierRegistry<Ctx> = IndexMap<String, Arc<dyn Applier<Ctx>>>;

/// What an applier can reach while it runs: the domain context, an
/// append-only handle on the compensation log, and dispatch of nested
/// actions through the same registry.
pub struct ApplyScope<'a, Ctx> {
    ctx: &'a Ctx,
    mode: ApplyMode,
    appliers: &'a ApplierRegistry<Ctx>,
    journal: Option<&'a mut dyn CompensationWriter>,
    depth: usize,
}

impl<'a, Ctx> ApplyScope<'a, Ctx> {
    pub(crate) fn applying(
        ctx: &'a Ctx,
        appliers: &'a ApplierRegistry<Ctx>,
        journal: &'a mut dyn CompensationWriter,
    ) -> Self {
        Self {
            ctx,
            mode: ApplyMode::Apply,
            appliers,
            journal: Some(journal),
            depth: 0,
        }
    }

    pub(crate) fn validating(ctx: &'a Ctx, appliers: &'a ApplierRegistry<Ctx>) -> Self {
        Self {
            ctx,
            mode: ApplyMode::ValidateOnly,
            appliers,
            journal: None,
            depth: 0,
        }
    }

    #[must_use]
    pub fn context(&self) -> &'a Ctx {
        self.ctx
    }

    #[must_use]
    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    #[must_use]
    pub fn is_validate_only(&self) -> bool {
        self.mode == ApplyMode::ValidateOnly
    }

    /// Nesting level of the action being applied; 0 for a top-level action.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append a compensation record describing how to reverse the mutation
    /// the applier is about to make (or just made).
    ///
    /// # Errors
    ///
    /// Returns an error in validate-only mode, if the payload cannot be
    /// encoded, or if the log cannot persist the record.
    pub fn record<P: Serialize>(&mut self, compensator: &str, payload: &P) -> Result<Mark> {
        let Some(journal) = self.journal.as_deref_mut() else {
            return Err(ActionError::RecordDuringValidation {
                compensator: compensator.to_string(),
            });
        };
        let payload =
            serde_json::to_value(payload).map_err(|source| ActionError::PayloadEncode {
                compensator: compensator.to_string(),
                source,
            })?;
        Ok(journal.append(CompensationRecord::new(compensator, payload))?)
    }

    /// Apply `action` through the registered applier for its type, in this
    /// scope's mode.
    ///
    /// # Errors
    ///
    /// Returns an error if no applier is registered for the action's type or
    /// if the applier fails.
    pub fn dispatch(&mut self, action: &Action) -> Result<Value> {
        let applier = self
            .appliers
            .get(&action.kind)
            .cloned()
            .ok_or_else(|| ActionError::UnknownActionType(action.kind.clone()))?;

        trace!(
            action_type = %action.kind,
            action = action.display_name(),
            depth = self.depth,
            mode = ?self.mode,
            "dispatching action"
        );
        self.depth += 1;
        let result = applier.apply(self, action);
        self.depth -= 1;
        result
    }
}

/// Decode a required parameter of `action`.
///
/// # Errors
///
/// Returns [`ActionError::Rejected`] if the parameter is missing and
/// [`ActionError::InvalidParam`] if it does not decode as `T`.
pub fn decode_param<T: DeserializeOwned>(action: &Action, param: &str) -> Result<T> {
    let value = action
        .param(param)
        .ok_or_else(|| ActionError::rejected(action, format!("missing parameter '{param}'")))?;
    serde_json::from_value(value.clone()).map_err(|source| ActionError::InvalidParam {
        action: action.display_name().to_string(),
        param: param.to_string(),
        source,
    })
}
