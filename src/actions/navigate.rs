use crate::actions::{Action, ActionContext, ActionResult};
use crate::error::{ChatTreeError, Result};
use crate::planner::{NavigationPlan, NavigationStep};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the plan_navigation action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanNavigationParams {
    /// Node to plan a path to
    pub node_id: String,
}

/// Computes both plan forms for a node without touching the page
#[derive(Default)]
pub struct PlanNavigationAction;

#[async_trait]
impl Action for PlanNavigationAction {
    type Params = PlanNavigationParams;

    fn name(&self) -> &str {
        "plan_navigation"
    }

    async fn execute_typed(&self, params: PlanNavigationParams, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        if !context.view.tree().contains(&params.node_id) {
            return Err(ChatTreeError::MalformedInput(format!("unknown node {}", params.node_id)));
        }
        let plan = context.view.plan(&params.node_id);
        let steps = context.view.steps(&params.node_id);
        Ok(ActionResult::success_with(serde_json::json!({
            "plan": plan,
            "steps": steps,
        })))
    }
}

/// Parameters for the execute_steps action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteStepsParams {
    /// Per-level click counts, root-most first
    pub steps: Vec<NavigationStep>,
}

/// Runs id-addressed click steps
#[derive(Default)]
pub struct ExecuteStepsAction;

#[async_trait]
impl Action for ExecuteStepsAction {
    type Params = ExecuteStepsParams;

    fn name(&self) -> &str {
        "execute_steps"
    }

    async fn execute_typed(&self, params: ExecuteStepsParams, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        let clicks = context.view.execute_steps(&params.steps).await?;
        Ok(ActionResult::success_with(serde_json::json!({ "clicks": clicks })))
    }
}

/// Parameters for the execute_steps_content action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteStepsContentParams {
    pub plan: NavigationPlan,
}

/// Runs a content-matched navigation plan with trusted input
#[derive(Default)]
pub struct ExecuteStepsContentAction;

#[async_trait]
impl Action for ExecuteStepsContentAction {
    type Params = ExecuteStepsContentParams;

    fn name(&self) -> &str {
        "execute_steps_content"
    }

    async fn execute_typed(
        &self,
        params: ExecuteStepsContentParams,
        context: &mut ActionContext<'_>,
    ) -> Result<ActionResult> {
        let report = context.view.execute_plan(&params.plan).await?;
        Ok(ActionResult::success_with(serde_json::to_value(report)?))
    }
}

/// Parameters for the go_to_node action
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GoToNodeParams {
    /// Node whose branch should become the rendered one
    pub node_id: String,

    /// Scroll the node into view afterwards (default: true)
    #[serde(default = "default_reveal")]
    pub reveal: bool,
}

fn default_reveal() -> bool {
    true
}

/// Plans, navigates, refreshes visibility and optionally scrolls to the node
#[derive(Default)]
pub struct GoToNodeAction;

#[async_trait]
impl Action for GoToNodeAction {
    type Params = GoToNodeParams;

    fn name(&self) -> &str {
        "go_to_node"
    }

    async fn execute_typed(&self, params: GoToNodeParams, context: &mut ActionContext<'_>) -> Result<ActionResult> {
        let outcome = context.view.go_to(&params.node_id).await?;

        let revealed = if params.reveal && outcome.visible {
            context.view.reveal(&params.node_id).await.unwrap_or_else(|e| {
                log::debug!("Reveal after navigation failed: {}", e);
                false
            })
        } else {
            false
        };

        Ok(ActionResult::success_with(serde_json::json!({
            "targetId": outcome.target_id,
            "clicks": outcome.clicks,
            "visible": outcome.visible,
            "revealed": revealed,
        })))
    }
}
