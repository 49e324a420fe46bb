use rewind_core::Action;
use serde_json::Value;

/// Transient hooks attached to an in-memory action.
///
/// Callbacks are never persisted and the engine does not depend on them.
/// They are matched to actions by structural equality.
#[derive(Default)]
pub struct ActionCallbacks {
    on_applied: Option<Box<dyn Fn(&Action, &Value) + Send + Sync>>,
    on_undone: Option<Box<dyn Fn(&Action) + Send + Sync>>,
}

impl ActionCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after the action is applied, including when it is redone.
    #[must_use]
    pub fn on_applied(mut self, callback: impl Fn(&Action, &Value) + Send + Sync + 'static) -> Self {
        self.on_applied = Some(Box::new(callback));
        self
    }

    /// Called after the action is undone.
    #[must_use]
    pub fn on_undone(mut self, callback: impl Fn(&Action) + Send + Sync + 'static) -> Self {
        self.on_undone = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for ActionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionCallbacks")
            .field("on_applied", &self.on_applied.is_some())
            .field("on_undone", &self.on_undone.is_some())
            .finish()
    }
}

/// Side channel from action identity to its callbacks.
#[derive(Debug, Default)]
pub(crate) struct CallbackRegistry {
    entries: Vec<(Action, ActionCallbacks)>,
}

impl CallbackRegistry {
    /// Attach `callbacks` to `action`, returning the ones they replace.
    pub(crate) fn attach(
        &mut self,
        action: &Action,
        callbacks: ActionCallbacks,
    ) -> Option<ActionCallbacks> {
        let previous = self.detach(action);
        self.entries.push((action.clone(), callbacks));
        previous
    }

    pub(crate) fn detach(&mut self, action: &Action) -> Option<ActionCallbacks> {
        let index = self
            .entries
            .iter()
            .position(|(attached, _)| attached == action)?;
        Some(self.entries.swap_remove(index).1)
    }

    pub(crate) fn applied(&self, action: &Action, result: &Value) {
        if let Some(callback) = self.find(action).and_then(|c| c.on_applied.as_ref()) {
            callback(action, result);
        }
    }

    pub(crate) fn undone(&self, action: &Action) {
        if let Some(callback) = self.find(action).and_then(|c| c.on_undone.as_ref()) {
            callback(action);
        }
    }

    /// Drop callbacks for actions no longer held in either list.
    pub(crate) fn retain_live(&mut self, live: &[Action]) {
        self.entries.retain(|(action, _)| live.contains(action));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn find(&self, action: &Action) -> Option<&ActionCallbacks> {
        self.entries
            .iter()
            .find(|(attached, _)| attached == action)
            .map(|(_, callbacks)| callbacks)
    }
}
