use super::hints::ChildHints;
use crate::tree::{ConversationTree, Node, Role};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Clicks needed at one level, expressed from the child currently rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationStep {
    /// The rendered child whose controls are clicked
    pub node_id: String,

    pub steps_left: usize,

    pub steps_right: usize,

    /// Role of the rendered child; decides which control group is used
    pub role: Role,

    /// All children of the ancestor, in order
    #[serde(default)]
    pub siblings: Vec<String>,

    #[serde(default)]
    pub target_index: usize,
}

impl NavigationStep {
    /// Index of `node_id` among `siblings`
    pub fn current_index(&self) -> Option<usize> {
        self.siblings.iter().position(|s| s == &self.node_id)
    }
}

/// Per-level click counts for id-addressed hosts, root-most first.
///
/// The rendered child at each level is the visible one if any, else the
/// hinted last-active child, else the last child (hosts open on the newest
/// branch). Levels already on the path are omitted.
pub fn plan_steps(tree: &ConversationTree, target_id: &str, hints: &impl ChildHints) -> Vec<NavigationStep> {
    let Some(target) = tree.get(target_id) else {
        return Vec::new();
    };

    let mut steps = Vec::new();
    let mut current = target;
    let mut guard = 0;

    while let Some(parent) = tree.parent_of(&current.id) {
        guard += 1;
        if guard > tree.len() {
            break;
        }
        if parent.children.len() > 1 {
            if let Some(step) = level_step(tree, parent, &current.id, hints) {
                steps.push(step);
            }
        }
        current = parent;
    }

    steps.reverse();
    steps
}

fn level_step(tree: &ConversationTree, parent: &Node, wanted: &str, hints: &impl ChildHints) -> Option<NavigationStep> {
    let target_index = parent.child_index(wanted)?;
    let rendered = rendered_child(tree, parent, hints)?;
    let current_index = parent.child_index(rendered)?;
    if current_index == target_index {
        return None;
    }

    let role = tree.get(rendered).map(|n| n.content.role).unwrap_or(Role::Assistant);
    Some(NavigationStep {
        node_id: rendered.to_string(),
        steps_left: current_index.saturating_sub(target_index),
        steps_right: target_index.saturating_sub(current_index),
        role,
        siblings: parent.children.clone(),
        target_index,
    })
}

fn rendered_child<'a>(tree: &'a ConversationTree, parent: &'a Node, hints: &impl ChildHints) -> Option<&'a str> {
    if let Some(visible) = tree.children_of(&parent.id).find(|c| c.is_visible()) {
        return Some(visible.id.as_str());
    }
    if let Some(hint) = hints.last_active_child(&parent.id) {
        if let Some(child) = parent.children.iter().find(|c| **c == hint) {
            return Some(child.as_str());
        }
    }
    parent.children.last().map(String::as_str)
}
