use super::node::{ConversationTree, Edge, Node, NodeContent, ROOT_ID, ROOT_TEXT, Role};
use crate::config::NavigationConfig;
use crate::conversation::{Provider, RawMessage};
use crate::error::Result;
use indexmap::IndexMap;
use std::future::Future;

/// Marker used when a message has no text at all
pub const NO_CONTENT: &str = "No content available";

/// Builds a [`ConversationTree`] from flat provider messages
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    provider: Provider,
    label_len: usize,
}

impl TreeBuilder {
    pub fn new(provider: Provider) -> Self {
        Self { provider, label_len: NavigationConfig::default().label_len }
    }

    pub fn with_config(provider: Provider, config: &NavigationConfig) -> Self {
        Self { provider, label_len: config.label_len }
    }

    /// Build the tree and initialise visibility.
    ///
    /// `check` is called once with the fingerprint of every non-root node
    /// (ids or full texts, depending on the provider) and must answer with a
    /// parallel list of "absent from DOM" flags.
    pub async fn build<F, Fut>(&self, messages: Vec<RawMessage>, check: F) -> Result<(ConversationTree, Vec<Edge>)>
    where
        F: FnOnce(Vec<String>) -> Fut,
        Fut: Future<Output = Result<Vec<bool>>>,
    {
        let mut tree = self.assemble(messages);
        let fingerprints = tree.message_fingerprints();
        let expected = fingerprints.len();
        let hidden = check(fingerprints).await?;
        if hidden.len() != expected {
            log::warn!("Visibility check answered {} flags for {} nodes", hidden.len(), expected);
        }
        tree.apply_hidden(&hidden);
        let edges = tree.edges();
        Ok((tree, edges))
    }

    /// Build the tree without consulting the host page. Every message node
    /// starts hidden until a visibility check says otherwise.
    pub fn assemble(&self, messages: Vec<RawMessage>) -> ConversationTree {
        let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(messages.len() + 1);
        nodes.insert(ROOT_ID.to_string(), self.root_node());

        // First pass: create every node
        for message in messages {
            if message.id == ROOT_ID || nodes.contains_key(&message.id) {
                log::warn!("Skipping duplicate message id {}", message.id);
                continue;
            }
            let text = join_segments(&message);
            let node = Node {
                id: message.id.clone(),
                parent: message.parent.clone(),
                children: Vec::new(),
                content: NodeContent {
                    role: message.role,
                    label: make_label(&text, self.label_len),
                    text,
                    timestamp: message.created_at.unwrap_or_else(now_seconds),
                    model: message.model,
                    content_type: message.content_type.filter(|t| !t.is_empty()).unwrap_or_else(|| "text".to_string()),
                },
                hidden: true,
                previously_visited: false,
            };
            nodes.insert(node.id.clone(), node);
        }

        // Second pass: resolve parents and link children in message order
        let ids: Vec<String> = nodes.keys().filter(|id| id.as_str() != ROOT_ID).cloned().collect();
        for id in ids {
            let requested = nodes.get(&id).and_then(|n| n.parent.clone());
            let parent = match requested {
                Some(p) if p != id && nodes.contains_key(&p) && !is_descendant(&nodes, &p, &id) => p,
                Some(p) => {
                    log::debug!("Message {} references unknown parent {}; attaching to root", id, p);
                    ROOT_ID.to_string()
                }
                None => ROOT_ID.to_string(),
            };
            if let Some(node) = nodes.get_mut(&id) {
                node.parent = Some(parent.clone());
            }
            if let Some(parent_node) = nodes.get_mut(&parent) {
                parent_node.children.push(id);
            }
        }

        ConversationTree::from_nodes(self.provider, nodes)
    }

    fn root_node(&self) -> Node {
        Node {
            id: ROOT_ID.to_string(),
            parent: None,
            children: Vec::new(),
            content: NodeContent {
                role: Role::System,
                text: ROOT_TEXT.to_string(),
                label: ROOT_TEXT.to_string(),
                timestamp: now_seconds(),
                model: None,
                content_type: "text".to_string(),
            },
            hidden: true,
            previously_visited: false,
        }
    }
}

/// True if following parent pointers up from `candidate` reaches `ancestor`.
/// Pointers of nodes not yet resolved are followed as requested, so a loop in
/// the payload is broken at the first member processed.
fn is_descendant(nodes: &IndexMap<String, Node>, candidate: &str, ancestor: &str) -> bool {
    let mut current = nodes.get(candidate).and_then(|n| n.parent.as_deref());
    let mut steps = 0;
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        steps += 1;
        if steps > nodes.len() {
            return true;
        }
        current = nodes.get(id).and_then(|n| n.parent.as_deref());
    }
    false
}

/// Join text segments with a blank line, skipping whitespace-only ones
pub fn join_segments(message: &RawMessage) -> String {
    let parts: Vec<&str> = message.segments.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if !parts.is_empty() {
        return parts.join("\n\n");
    }
    match message.fallback_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_CONTENT.to_string(),
    }
}

/// First `max_len` characters, with an ellipsis when truncated
pub fn make_label(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}
