use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mark::Mark;

/// Type name of the built-in composite action.
pub const COMPOSITE_TYPE: &str = "Composite";

/// A named, typed request to mutate owned state.
///
/// Actions are plain data: the `type` field selects the applier, and any
/// additional fields are carried in `params` and flattened into the same
/// JSON object. Two equal actions are interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_actions: Option<Vec<Action>>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// Borrowed view of what an action is, for dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionKind<'a> {
    /// The built-in composite kind. `sub_actions` is `None` when the action
    /// was built without a sub-action list.
    Composite { sub_actions: Option<&'a [Action]> },
    /// Any kind handled by a registered applier.
    Registered(&'a str),
}

impl Action {
    /// Create an action of type `kind`, without description, sub-actions or
    /// params.
    ///
    /// `name` is the human-readable label used in logs and notifications.
    ///
    /// ```
    /// use rewind_core::Action;
    ///
    /// let action = Action::new("Rename", "rename draft")
    ///     .with_description("rename the draft to 'final'")
    ///     .with_param("to", "final");
    ///
    /// assert_eq!(action.kind, "Rename");
    /// assert_eq!(action.display_name(), "rename draft");
    /// assert_eq!(action.param("to"), Some(&serde_json::json!("final")));
    /// assert!(!action.is_composite());
    /// ```
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            description: None,
            sub_actions: None,
            params: Map::new(),
        }
    }

    /// Build a composite action applying `sub_actions` in order as one unit.
    #[must_use]
    pub fn composite(name: impl Into<String>, sub_actions: Vec<Action>) -> Self {
        Self {
            sub_actions: Some(sub_actions),
            ..Self::new(COMPOSITE_TYPE, name)
        }
    }

    /// Attach a longer, free-form description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the param `key`, replacing any previous value. Params are
    /// flattened next to `type` and `name` when the action is serialized,
    /// so `key` should not collide with those fields.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The value of param `key`, if set. Use `decode_param` to read it as
    /// a typed value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Classify the action for dispatch.
    #[must_use]
    pub fn kind(&self) -> ActionKind<'_> {
        if self.kind == COMPOSITE_TYPE {
            ActionKind::Composite {
                sub_actions: self.sub_actions.as_deref(),
            }
        } else {
            ActionKind::Registered(&self.kind)
        }
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self.kind(), ActionKind::Composite { .. })
    }

    /// Name to show in logs and errors, falling back to the type.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.kind
        } else {
            &self.name
        }
    }
}

/// An applied action together with the compensation mark taken right
/// before it was applied.
///
/// Rewinding the compensation log to `mark` reverses the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub mark: Mark,
    pub action: Action,
}

impl ActionEntry {
    #[must_use]
    pub fn new(mark: Mark, action: Action) -> Self {
        Self { mark, action }
    }
}
