use rewind_core::{Action, ActionKind};
use serde_json::Value;
use tracing::debug;

use crate::applier::{ApplyScope, Applier};
use crate::error::{ActionError, Result};

/// Built-in applier for [`COMPOSITE_TYPE`](rewind_core::COMPOSITE_TYPE).
///
/// Applies each sub-action in order through the scope's dispatch and returns
/// their results as a JSON array. It stops at the first failing sub-action;
/// rolling back the ones already applied is left to the enclosing
/// checkpoint, which covers the whole composite.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeApplier;

impl<Ctx> Applier<Ctx> for CompositeApplier {
    fn apply(&self, scope: &mut ApplyScope<'_, Ctx>, action: &Action) -> Result<Value> {
        let ActionKind::Composite { sub_actions } = action.kind() else {
            return Err(ActionError::NotComposite {
                name: action.display_name().to_string(),
                kind: action.kind.clone(),
            });
        };
        let sub_actions = sub_actions.ok_or_else(|| ActionError::MissingSubActions {
            name: action.display_name().to_string(),
        })?;

        let mut results = Vec::with_capacity(sub_actions.len());
        for (index, sub_action) in sub_actions.iter().enumerate() {
            match scope.dispatch(sub_action) {
                Ok(result) => results.push(result),
                Err(error) => {
                    debug!(
                        composite = action.display_name(),
                        index,
                        sub_action = sub_action.display_name(),
                        %error,
                        "sub-action failed"
                    );
                    return Err(error);
                }
            }
        }

        Ok(Value::Array(results))
    }
}
