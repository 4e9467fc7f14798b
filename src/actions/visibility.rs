use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the check_nodes action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckNodesParams {
    /// Message ids or full texts, depending on the host
    pub fingerprints: Vec<String>,
}

/// Reports, per fingerprint, whether it is absent from the page
#[derive(Default)]
pub struct CheckNodesAction;

#[async_trait]
impl Action for CheckNodesAction {
    type Params = CheckNodesParams;

    fn name(&self) -> &str {
        "check_nodes"
    }

    async fn execute_typed(&self, params: CheckNodesParams, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        let hidden = context.view.check_hidden(&params.fingerprints).await?;
        Ok(ActionResult::success_with(serde_json::json!({ "hidden": hidden })))
    }
}

/// Parameters for the refresh_visibility action
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RefreshVisibilityParams {}

/// Re-reads which nodes are rendered
#[derive(Default)]
pub struct RefreshVisibilityAction;

#[async_trait]
impl Action for RefreshVisibilityAction {
    type Params = RefreshVisibilityParams;

    fn name(&self) -> &str {
        "refresh_visibility"
    }

    async fn execute_typed(
        &self,
        _params: RefreshVisibilityParams,
        context: &mut ActionContext<'_>,
    ) -> Result<ActionResult> {
        context.view.refresh_visibility().await?;
        let tree = context.view.tree();
        let previously_visited: Vec<&str> =
            tree.messages().filter(|n| n.previously_visited).map(|n| n.id.as_str()).collect();
        Ok(ActionResult::success_with(serde_json::json!({
            "visible": tree.visible_ids(),
            "previouslyVisited": previously_visited,
        })))
    }
}

/// Parameters for the go_to_target action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GoToTargetParams {
    /// Node to scroll into view
    pub node_id: String,
}

/// Scrolls a rendered node into view; unsuccessful when it is not rendered
#[derive(Default)]
pub struct GoToTargetAction;

#[async_trait]
impl Action for GoToTargetAction {
    type Params = GoToTargetParams;

    fn name(&self) -> &str {
        "go_to_target"
    }

    async fn execute_typed(&self, params: GoToTargetParams, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        let found = context.view.reveal(&params.node_id).await?;
        Ok(ActionResult::found(found))
    }
}
