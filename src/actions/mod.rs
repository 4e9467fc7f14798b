//! Action layer
//!
//! Every page-facing operation is exposed as a named [`Action`] with typed,
//! schema-described parameters. Results follow one contract: `success`,
//! `completed`, an optional `error` and optional `data`. Callers never see a
//! raw error from [`ActionRegistry::execute`].

pub mod compose;
pub mod navigate;
pub mod visibility;

pub use compose::{EditMessageAction, EditMessageParams, RespondToMessageAction, RespondToMessageParams};
pub use navigate::{
    ExecuteStepsAction, ExecuteStepsContentAction, ExecuteStepsContentParams, ExecuteStepsParams, GoToNodeAction,
    GoToNodeParams, PlanNavigationAction, PlanNavigationParams,
};
pub use visibility::{
    CheckNodesAction, CheckNodesParams, GoToTargetAction, GoToTargetParams, RefreshVisibilityAction,
    RefreshVisibilityParams,
};

use crate::error::{ChatTreeError, Result};
use crate::view::ConversationView;
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform outcome of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,

    pub completed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self { success: true, completed: true, error: None, data: None }
    }

    pub fn success_with(data: Value) -> Self {
        Self { data: Some(data), ..Self::success() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, completed: false, error: Some(error.into()), data: None }
    }

    pub fn from_error(error: &ChatTreeError) -> Self {
        Self::failure(error.to_string())
    }

    /// Lookups report "not found" as an unsuccessful, non-error result
    pub fn found(found: bool) -> Self {
        Self { success: found, completed: found, error: None, data: None }
    }
}

/// What an action runs against
pub struct ActionContext<'a> {
    pub view: &'a mut ConversationView,
}

impl<'a> ActionContext<'a> {
    pub fn new(view: &'a mut ConversationView) -> Self {
        Self { view }
    }
}

/// A named operation with typed parameters
#[async_trait]
pub trait Action: Send + Sync + Default {
    type Params: JsonSchema + DeserializeOwned + Send;

    fn name(&self) -> &str;

    /// JSON schema of [`Self::Params`]
    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Params)).unwrap_or_default()
    }

    async fn execute_typed(&self, params: Self::Params, context: &mut ActionContext<'_>) -> Result<ActionResult>;
}

/// Object-safe form of [`Action`] used by the registry
#[async_trait]
pub trait DynAction: Send + Sync {
    fn action_name(&self) -> &str;

    fn schema(&self) -> Value;

    async fn execute_value(&self, params: Value, context: &mut ActionContext<'_>) -> Result<ActionResult>;
}

#[async_trait]
impl<A: Action> DynAction for A {
    fn action_name(&self) -> &str {
        Action::name(self)
    }

    fn schema(&self) -> Value {
        Action::parameters_schema(self)
    }

    async fn execute_value(&self, params: Value, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        let typed: A::Params = serde_json::from_value(params).map_err(|e| ChatTreeError::ActionFailed {
            action: Action::name(self).to_string(),
            reason: format!("Invalid parameters: {}", e),
        })?;
        self.execute_typed(typed, context).await
    }
}

/// Actions by name, in registration order
#[derive(Default)]
pub struct ActionRegistry {
    actions: IndexMap<String, Box<dyn DynAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in action
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CheckNodesAction);
        registry.register(RefreshVisibilityAction);
        registry.register(PlanNavigationAction);
        registry.register(ExecuteStepsAction);
        registry.register(ExecuteStepsContentAction);
        registry.register(GoToNodeAction);
        registry.register(GoToTargetAction);
        registry.register(EditMessageAction);
        registry.register(RespondToMessageAction);
        registry
    }

    pub fn register<A: Action + 'static>(&mut self, action: A) {
        let name = Action::name(&action).to_string();
        self.actions.insert(name, Box::new(action));
    }

    pub fn get(&self, name: &str) -> Option<&dyn DynAction> {
        self.actions.get(name).map(|a| a.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Parameter schemas keyed by action name
    pub fn schemas(&self) -> IndexMap<String, Value> {
        self.actions.iter().map(|(name, action)| (name.clone(), action.schema())).collect()
    }

    /// Run an action by name. Failures come back as unsuccessful results.
    pub async fn execute(&self, name: &str, params: Value, context: &mut ActionContext<'_>) -> ActionResult {
        let Some(action) = self.get(name) else {
            return ActionResult::failure(format!("Unknown action: {}", name));
        };

        match action.execute_value(params, context).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Action '{}' failed: {}", name, e);
                ActionResult::from_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let registry = ActionRegistry::with_defaults();
        assert_eq!(registry.len(), 9);
        assert!(registry.get("go_to_node").is_some());
        assert!(registry.get("respond_to_message").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names()[0], "check_nodes");
    }

    #[test]
    fn test_schemas_are_objects() {
        let registry = ActionRegistry::with_defaults();
        for (name, schema) in registry.schemas() {
            assert!(schema.is_object(), "schema for {} is not an object", name);
        }
    }

    #[test]
    fn test_result_serialization() {
        let failed = ActionResult::from_error(&ChatTreeError::not_found("Textarea", "after 10 attempts"));
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["completed"], false);
        assert_eq!(value["error"], "Textarea not found: after 10 attempts");
        assert!(value.get("data").is_none());

        let found = ActionResult::found(true);
        assert!(found.success && found.completed && found.error.is_none());
    }
}
