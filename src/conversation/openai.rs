use super::RawMessage;
use crate::tree::Role;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A ChatGPT conversation as returned by `backend-api/conversation/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConversation {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Node currently being viewed
    #[serde(default)]
    pub current_node: Option<String>,

    #[serde(default)]
    pub default_model_slug: Option<String>,

    /// All nodes keyed by id, in payload order
    pub mapping: IndexMap<String, OpenAiNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiNode {
    pub id: String,

    #[serde(default)]
    pub message: Option<OpenAiMessage>,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub id: String,
    pub author: OpenAiAuthor,

    /// Unix seconds
    #[serde(default)]
    pub create_time: Option<f64>,

    pub content: OpenAiContent,

    #[serde(default)]
    pub metadata: OpenAiMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiAuthor {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiContent {
    #[serde(default)]
    pub content_type: String,

    /// Text parts; non-string parts (images, tool payloads) are skipped
    #[serde(default)]
    pub parts: Option<Vec<serde_json::Value>>,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiMetadata {
    #[serde(default)]
    pub model_slug: Option<String>,

    #[serde(default)]
    pub is_visually_hidden_from_conversation: Option<bool>,
}

impl OpenAiNode {
    /// Nodes without a message, or hidden by the host, never render
    fn is_renderable(&self) -> bool {
        match &self.message {
            Some(message) => !message.metadata.is_visually_hidden_from_conversation.unwrap_or(false),
            None => false,
        }
    }
}

impl OpenAiConversation {
    /// Flatten into provider-neutral messages.
    ///
    /// Messages are emitted in a pre-order walk that follows each node's
    /// `children` array so sibling order matches the host's "n / total"
    /// ordering. Non-renderable nodes are skipped and their children are
    /// re-parented onto the nearest renderable ancestor.
    pub fn raw_messages(&self) -> Vec<RawMessage> {
        let mut order: Vec<&str> = Vec::with_capacity(self.mapping.len());
        let mut seen: HashSet<&str> = HashSet::new();

        let roots: Vec<&str> = self
            .mapping
            .values()
            .filter(|node| node.parent.as_deref().is_none_or(|p| !self.mapping.contains_key(p)))
            .map(|node| node.id.as_str())
            .collect();

        for root in roots {
            self.walk(root, &mut order, &mut seen);
        }
        // Nodes unreachable from any root (cyclic or dangling payloads)
        let leftovers: Vec<&str> = self.mapping.keys().map(String::as_str).filter(|id| !seen.contains(id)).collect();
        for id in leftovers {
            self.walk(id, &mut order, &mut seen);
        }

        order
            .into_iter()
            .filter_map(|id| self.mapping.get(id))
            .filter(|node| node.is_renderable())
            .filter_map(|node| {
                let message = node.message.as_ref()?;
                let segments = message
                    .content
                    .parts
                    .as_ref()
                    .map(|parts| parts.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                Some(RawMessage {
                    id: node.id.clone(),
                    parent: self.renderable_ancestor(node),
                    role: Role::parse(&message.author.role),
                    segments,
                    fallback_text: message.content.text.clone(),
                    created_at: message.create_time.map(|t| t as i64),
                    model: message.metadata.model_slug.clone(),
                    content_type: Some(message.content.content_type.clone()),
                })
            })
            .collect()
    }

    fn walk<'a>(&'a self, id: &'a str, order: &mut Vec<&'a str>, seen: &mut HashSet<&'a str>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(node) = self.mapping.get(current) {
                for child in node.children.iter().rev() {
                    stack.push(child.as_str());
                }
            }
        }
    }

    fn renderable_ancestor(&self, node: &OpenAiNode) -> Option<String> {
        let mut visited = HashSet::new();
        let mut parent = node.parent.as_deref();
        while let Some(id) = parent {
            if !visited.insert(id) {
                return None;
            }
            let candidate = self.mapping.get(id)?;
            if candidate.is_renderable() {
                return Some(candidate.id.clone());
            }
            parent = candidate.parent.as_deref();
        }
        None
    }
}
