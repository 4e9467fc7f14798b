use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the edit_message action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditMessageParams {
    /// Message to edit
    pub node_id: String,

    /// Replacement text
    pub text: String,
}

/// Edits a message, creating a new sibling branch on the host
#[derive(Default)]
pub struct EditMessageAction;

#[async_trait]
impl Action for EditMessageAction {
    type Params = EditMessageParams;

    fn name(&self) -> &str {
        "edit_message"
    }

    async fn execute_typed(&self, params: EditMessageParams, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        context.view.edit(&params.node_id, &params.text).await?;
        Ok(ActionResult::success())
    }
}

/// Parameters for the respond_to_message action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RespondToMessageParams {
    /// Message to answer under
    pub node_id: String,

    pub text: String,
}

/// Answers under a message by editing its first rendered child
#[derive(Default)]
pub struct RespondToMessageAction;

#[async_trait]
impl Action for RespondToMessageAction {
    type Params = RespondToMessageParams;

    fn name(&self) -> &str {
        "respond_to_message"
    }

    async fn execute_typed(
        &self,
        params: RespondToMessageParams,
        context: &mut ActionContext<'_>,
    ) -> Result<ActionResult> {
        context.view.respond(&params.node_id, &params.text).await?;
        Ok(ActionResult::success())
    }
}
