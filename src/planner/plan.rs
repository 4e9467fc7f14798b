use super::fingerprint::{anchor_excerpt, fingerprints, primary_fingerprint};
use crate::config::NavigationConfig;
use crate::conversation::Addressing;
use crate::oracle::normalize_for_match;
use crate::tree::{ConversationTree, Node};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One sibling selection needed at an ancestor with more than one child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDecision {
    /// Number of children of the ancestor, always at least 2
    pub sibling_count: usize,

    /// 0-based position of the path child among the ancestor's children
    pub target_index: usize,

    /// Excerpt of the ancestor's own text; absent when the ancestor is the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestor_fingerprint: Option<String>,

    /// Prefix excerpt of each sibling, best effort, deduplicated
    #[serde(default)]
    pub sibling_fingerprints: Vec<String>,

    /// Id of the ancestor this decision belongs to
    #[serde(default)]
    pub parent_id: String,

    /// Id of the child that must end up selected
    #[serde(default)]
    pub child_id: String,
}

/// Ordered decisions, root-most first, plus excerpts of the target itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPlan {
    pub target_id: String,

    pub decisions: Vec<NavigationDecision>,

    /// Excerpts used to recognise the target once it is rendered
    #[serde(default)]
    pub target_fingerprints: Vec<String>,
}

impl NavigationPlan {
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }
}

/// Compute the sibling selections that make `target_id` part of the rendered
/// path. Unknown targets produce an empty plan.
pub fn plan(tree: &ConversationTree, target_id: &str, config: &NavigationConfig) -> NavigationPlan {
    let Some(target) = tree.get(target_id) else {
        log::debug!("Plan requested for unknown node {}", target_id);
        return NavigationPlan::default();
    };

    let by_content = tree.provider.addressing() == Addressing::ByContent;
    let mut decisions = Vec::new();
    let mut current = target;
    let mut guard = 0;

    while let Some(parent) = tree.parent_of(&current.id) {
        guard += 1;
        if guard > tree.len() {
            break;
        }
        if parent.children.len() > 1 {
            if let Some(index) = parent.child_index(&current.id) {
                decisions.push(decision(tree, parent, current, index, by_content, config));
            }
        }
        current = parent;
    }
    decisions.reverse();

    let target_fingerprints = if by_content && !target.is_root() {
        let mut needles = fingerprints(&matchable(target), config);
        needles.truncate(config.max_target_needles);
        needles
    } else {
        Vec::new()
    };

    NavigationPlan { target_id: target.id.clone(), decisions, target_fingerprints }
}

/// Excerpts are cut from the text as the page shows it, so a cut never
/// lands inside markup the page does not render
fn matchable(node: &Node) -> String {
    normalize_for_match(&node.content.text)
}

fn decision(
    tree: &ConversationTree,
    parent: &Node,
    child: &Node,
    index: usize,
    by_content: bool,
    config: &NavigationConfig,
) -> NavigationDecision {
    let (ancestor_fingerprint, sibling_fingerprints) = if by_content {
        let anchor = if parent.is_root() { None } else { anchor_excerpt(&matchable(parent), config.anchor_len) };
        let mut siblings: Vec<String> = Vec::new();
        for sibling in tree.children_of(&parent.id) {
            if siblings.len() >= config.max_sibling_needles {
                break;
            }
            if let Some(needle) = primary_fingerprint(&matchable(sibling), config) {
                if !siblings.contains(&needle) {
                    siblings.push(needle);
                }
            }
        }
        (anchor, siblings)
    } else {
        (None, Vec::new())
    };

    NavigationDecision {
        sibling_count: parent.children.len(),
        target_index: index,
        ancestor_fingerprint,
        sibling_fingerprints,
        parent_id: parent.id.clone(),
        child_id: child.id.clone(),
    }
}
