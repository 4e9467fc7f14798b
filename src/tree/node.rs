use crate::conversation::{Addressing, Provider};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Id of the synthetic node standing for "start of conversation"
pub const ROOT_ID: &str = "root";

/// Text shown for the synthetic root node
pub const ROOT_TEXT: &str = "Start of your conversation";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "human")]
    User,
    Assistant,
    System,
}

impl Role {
    /// Map a provider role string; anything unrecognised is treated as system
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::System,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Message content carried by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeContent {
    pub role: Role,

    /// Canonical full text
    pub text: String,

    /// Bounded preview for compact display
    pub label: String,

    /// Unix seconds
    pub timestamp: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub content_type: String,
}

/// One message in the conversation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,

    /// `None` only for the root
    pub parent: Option<String>,

    /// Child ids in provider message order
    pub children: Vec<String>,

    pub content: NodeContent,

    /// True when the host page does not render this node
    pub hidden: bool,

    /// Set when a node left the rendered path during the last navigation
    /// while its parent also went hidden
    #[serde(default)]
    pub previously_visited: bool,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Position of `child_id` among this node's children
    pub fn child_index(&self, child_id: &str) -> Option<usize> {
        self.children.iter().position(|c| c == child_id)
    }
}

/// Parent-to-child link for graph rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: &str, target: &str) -> Self {
        Self { id: format!("{}-{}", source, target), source: source.to_string(), target: target.to_string() }
    }
}

/// Conversation tree rooted at [`ROOT_ID`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTree {
    pub provider: Provider,

    /// Nodes in insertion order, root first
    nodes: IndexMap<String, Node>,
}

impl ConversationTree {
    pub(crate) fn from_nodes(provider: Provider, nodes: IndexMap<String, Node>) -> Self {
        Self { provider, nodes }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(ROOT_ID)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Every node except the root, in insertion order
    pub fn messages(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.is_root())
    }

    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)?.parent.as_deref().and_then(|p| self.nodes.get(p))
    }

    pub fn children_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Node> + use<'a> {
        let children = self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or_default();
        children.iter().filter_map(|c| self.nodes.get(c))
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.nodes
            .values()
            .filter_map(|node| node.parent.as_deref().map(|parent| Edge::new(parent, &node.id)))
            .collect()
    }

    /// Ids from the root down to `id`, inclusive. Empty if `id` is unknown.
    pub fn path_to(&self, id: &str) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            path.push(node.id.as_str());
            if path.len() > self.nodes.len() {
                break;
            }
            current = node.parent.as_deref().and_then(|p| self.nodes.get(p));
        }
        path.reverse();
        path
    }

    /// The value the host page is queried with for a node: its id for
    /// id-addressed hosts, its full text otherwise
    pub fn fingerprint_of<'a>(&self, node: &'a Node) -> &'a str {
        match self.provider.addressing() {
            Addressing::ById => &node.id,
            Addressing::ByContent => &node.content.text,
        }
    }

    /// Fingerprints of all non-root nodes, in [`messages`](Self::messages) order
    pub fn message_fingerprints(&self) -> Vec<String> {
        self.messages().map(|n| self.fingerprint_of(n).to_string()).collect()
    }

    /// Apply "absent from DOM" flags, parallel to [`messages`](Self::messages).
    /// Returns how many flags were applied.
    pub fn apply_hidden(&mut self, hidden: &[bool]) -> usize {
        let mut applied = 0;
        for (node, flag) in self.nodes.values_mut().filter(|n| !n.is_root()).zip(hidden) {
            node.hidden = *flag;
            applied += 1;
        }
        applied
    }

    /// Ids of non-root nodes currently rendered by the host
    pub fn visible_ids(&self) -> Vec<String> {
        self.messages().filter(|n| n.is_visible()).map(|n| n.id.clone()).collect()
    }

    /// Flag nodes that were rendered before a navigation and dropped out of
    /// the path together with their (non-root) parent. Clears the flag
    /// everywhere else. Returns how many nodes were flagged.
    pub fn mark_previously_visited(&mut self, previous_visible: &[String]) -> usize {
        let previous: HashSet<&str> = previous_visible.iter().map(String::as_str).collect();
        let flagged: HashSet<String> = self
            .messages()
            .filter(|node| node.hidden && previous.contains(node.id.as_str()))
            .filter(|node| {
                self.parent_of(&node.id).is_some_and(|parent| !parent.is_root() && parent.hidden)
            })
            .map(|node| node.id.clone())
            .collect();

        for node in self.nodes.values_mut() {
            node.previously_visited = flagged.contains(&node.id);
        }
        flagged.len()
    }
}
