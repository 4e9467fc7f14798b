use super::{RawMessage, parse_iso_timestamp};
use crate::tree::Role;
use serde::{Deserialize, Serialize};

/// Parent reference Claude uses for messages that start the conversation
pub const EMPTY_PARENT_UUID: &str = "00000000-0000-4000-8000-000000000000";

/// A Claude conversation as returned by the `chat_conversations/{id}?tree=True` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConversation {
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    /// Latest message of the thread the host currently shows
    #[serde(default)]
    pub current_leaf_message_uuid: Option<String>,

    pub chat_messages: Vec<ClaudeChatMessage>,
}

/// One message in a Claude conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeChatMessage {
    pub uuid: String,

    /// Often empty; used when no content block carries text
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub content: Vec<ClaudeContentBlock>,

    /// "human" or "assistant"
    pub sender: String,

    #[serde(default)]
    pub index: u64,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub parent_message_uuid: Option<String>,
}

/// A content block inside a Claude message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl ClaudeChatMessage {
    fn parent(&self) -> Option<String> {
        match self.parent_message_uuid.as_deref() {
            None | Some("") | Some(EMPTY_PARENT_UUID) => None,
            Some(parent) => Some(parent.to_string()),
        }
    }
}

impl ClaudeConversation {
    /// Flatten into provider-neutral messages, preserving message order
    pub fn raw_messages(&self) -> Vec<RawMessage> {
        self.chat_messages
            .iter()
            .map(|message| RawMessage {
                id: message.uuid.clone(),
                parent: message.parent(),
                role: Role::parse(&message.sender),
                segments: message.content.iter().filter_map(|block| block.text.clone()).collect(),
                fallback_text: Some(message.text.clone()),
                created_at: message.created_at.as_deref().and_then(parse_iso_timestamp),
                model: None,
                content_type: message.content.first().map(|block| block.kind.clone()),
            })
            .collect()
    }
}
