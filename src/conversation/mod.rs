//! Provider conversation payloads
//!
//! Two hosts are supported:
//! - Claude: messages carry no DOM-queryable id, so rendered messages are
//!   matched by content
//! - ChatGPT: every rendered message exposes `data-message-id`
//!
//! Both payloads are flattened into [`RawMessage`]s for the tree builder.

pub mod claude;
pub mod openai;

pub use claude::ClaudeConversation;
pub use openai::OpenAiConversation;

use crate::error::{ChatTreeError, Result};
use crate::tree::Role;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Host page origins
pub const CLAUDE_ORIGIN: &str = "https://claude.ai";
pub const CHATGPT_ORIGIN: &str = "https://chatgpt.com";

/// The chat host a conversation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    #[serde(rename = "openai")]
    ChatGpt,
}

/// How rendered messages are identified on the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Stable `data-message-id` attributes
    ById,
    /// Fuzzy text matching
    ByContent,
}

impl Provider {
    pub fn addressing(self) -> Addressing {
        match self {
            Provider::Claude => Addressing::ByContent,
            Provider::ChatGpt => Addressing::ById,
        }
    }

    /// Detect the provider from a tab URL
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with(CLAUDE_ORIGIN) {
            Some(Provider::Claude)
        } else if url.starts_with(CHATGPT_ORIGIN) {
            Some(Provider::ChatGpt)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::ChatGpt => "openai",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = ChatTreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Provider::Claude),
            "openai" | "chatgpt" => Ok(Provider::ChatGpt),
            other => Err(ChatTreeError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// A provider message reduced to what the tree builder needs
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub id: String,

    /// `None` when the provider used its "no parent" sentinel or omitted it
    pub parent: Option<String>,

    pub role: Role,

    /// Text-bearing segments in order (content blocks or parts)
    pub segments: Vec<String>,

    /// Single `text` field used when no segment has content
    pub fallback_text: Option<String>,

    /// Unix seconds
    pub created_at: Option<i64>,

    pub model: Option<String>,

    pub content_type: Option<String>,
}

impl RawMessage {
    /// Create a message with a single text segment
    pub fn new(id: impl Into<String>, parent: Option<&str>, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: parent.map(str::to_string),
            role,
            segments: vec![text.into()],
            fallback_text: None,
            created_at: None,
            model: None,
            content_type: None,
        }
    }
}

/// A fetched conversation payload
#[derive(Debug, Clone)]
pub enum Conversation {
    Claude(ClaudeConversation),
    ChatGpt(OpenAiConversation),
}

impl Conversation {
    /// Parse a payload, detecting the provider by shape
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.get("chat_messages").is_some() {
            serde_json::from_value(value)
                .map(Conversation::Claude)
                .map_err(|e| ChatTreeError::InvalidPayload(format!("Claude conversation: {}", e)))
        } else if value.get("mapping").is_some() {
            serde_json::from_value(value)
                .map(Conversation::ChatGpt)
                .map_err(|e| ChatTreeError::InvalidPayload(format!("ChatGPT conversation: {}", e)))
        } else {
            Err(ChatTreeError::InvalidPayload(
                "expected either `chat_messages` or `mapping` at the top level".to_string(),
            ))
        }
    }

    /// Parse a payload from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn provider(&self) -> Provider {
        match self {
            Conversation::Claude(_) => Provider::Claude,
            Conversation::ChatGpt(_) => Provider::ChatGpt,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Conversation::Claude(c) => &c.name,
            Conversation::ChatGpt(c) => &c.title,
        }
    }

    /// The message the host currently treats as the end of the visible thread
    pub fn current_leaf(&self) -> Option<&str> {
        match self {
            Conversation::Claude(c) => c.current_leaf_message_uuid.as_deref(),
            Conversation::ChatGpt(c) => c.current_node.as_deref(),
        }
    }

    pub fn raw_messages(&self) -> Vec<RawMessage> {
        match self {
            Conversation::Claude(c) => c.raw_messages(),
            Conversation::ChatGpt(c) => c.raw_messages(),
        }
    }
}

/// Parse an ISO-8601 timestamp into Unix seconds
pub(crate) fn parse_iso_timestamp(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value.trim()).ok().map(|dt| dt.timestamp())
}
