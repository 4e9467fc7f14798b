//! Host page seams
//!
//! The navigator never touches the DOM directly. Everything it needs from
//! the host page goes through the traits below, which [`ChromePage`]
//! implements over CDP and tests implement in memory.

pub mod chrome;

pub use chrome::{ChromeInputChannel, ChromePage};

use crate::error::Result;
use crate::tree::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Viewport coordinates in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rendered "current / total" sibling control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchIndicator {
    /// Position among all indicators in document order
    pub dom_index: usize,

    /// 1-based position shown by the control
    pub current: usize,

    pub total: usize,

    /// Rendered text of the message block carrying the control
    pub wrapper_text: String,

    /// Rendered text of the message block right above it
    #[serde(default)]
    pub preceding_text: String,

    pub hover_point: Point,

    pub previous: Option<Point>,

    pub next: Option<Point>,

    /// Top edge of the message block, used as a tie-break
    pub top: f64,
}

impl BranchIndicator {
    /// 0-based selected index
    pub fn current_index(&self) -> usize {
        self.current.saturating_sub(1)
    }

    pub fn button(&self, direction: Direction) -> Option<Point> {
        match direction {
            Direction::Previous => self.previous,
            Direction::Next => self.next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    /// Direction that moves `current` toward `target`
    pub fn toward(current: usize, target: usize) -> Self {
        if current < target { Direction::Next } else { Direction::Previous }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Previous => "Previous",
            Direction::Next => "Next",
        }
    }
}

/// Scroll container state after a scroll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPosition {
    pub scroll_top: f64,
    pub max_scroll_top: f64,
}

/// How a message is found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "by", content = "value")]
pub enum MessageLocator {
    /// `data-message-id` attribute
    Id(String),
    /// Whitespace-normalized text equality with a rendered container
    Text(String),
}

/// Result of clicking a control that should change the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickOutcome {
    /// The control is not rendered (yet)
    Missing,
    /// Clicked and the page mutated, or no mutation wait was requested
    Settled,
    /// Clicked but nothing changed within the wait
    Unchanged,
}

/// Result of looking up and clicking a message's edit control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOutcome {
    Clicked,
    MessageMissing,
    ControlMissing,
}

/// Page queries for hosts without stable message ids
#[async_trait]
pub trait ContentPage: Send + Sync {
    /// Rendered text of every message block that carries an actions group
    async fn message_texts(&self) -> Result<Vec<String>>;

    /// All rendered branch controls, in document order
    async fn branch_indicators(&self) -> Result<Vec<BranchIndicator>>;

    /// Scroll an indicator's block to the viewport centre and read it again
    async fn reveal_indicator(&self, dom_index: usize) -> Result<Option<BranchIndicator>>;

    /// Inner HTML of every rendered message content container
    async fn content_containers(&self) -> Result<Vec<String>>;

    /// Scroll the container at `index` into view
    async fn reveal_container(&self, index: usize) -> Result<bool>;

    /// Visible height of the conversation scroller
    async fn viewport_height(&self) -> Result<f64>;

    async fn scroll_to_top(&self) -> Result<()>;

    /// Scroll by `dy` pixels, clamped. `None` when there is no scroller.
    async fn scroll_by(&self, dy: f64) -> Result<Option<ScrollPosition>>;
}

/// Page queries for hosts that tag messages with their ids
#[async_trait]
pub trait MessageIdPage: Send + Sync {
    /// For each id, whether a message element with that id is rendered
    async fn messages_present(&self, ids: &[String]) -> Result<Vec<bool>>;

    /// Dispatch synthetic hover and pointer events over a message subtree
    async fn prime_controls(&self, node_id: &str) -> Result<()>;

    /// Prime every rendered conversation turn
    async fn prime_all(&self) -> Result<()>;

    /// Click the previous/next control next to a message, then wait up to
    /// `settle` for the page to mutate
    async fn click_branch_button(
        &self,
        node_id: &str,
        role: Role,
        direction: Direction,
        settle: Duration,
    ) -> Result<ClickOutcome>;

    async fn reveal_message(&self, node_id: &str) -> Result<bool>;
}

/// Message editing controls
#[async_trait]
pub trait ComposerPage: Send + Sync {
    async fn click_edit_button(&self, locator: &MessageLocator) -> Result<EditOutcome>;

    /// Put `text` into the open editor and fire an input event.
    /// `false` while no editor is rendered.
    async fn fill_editor(&self, locator: &MessageLocator, text: &str) -> Result<bool>;

    /// Click the editor's submit control. With `settle`, wait that long for
    /// the page to mutate.
    async fn submit_edit(&self, locator: &MessageLocator, settle: Option<Duration>) -> Result<ClickOutcome>;
}

/// Trusted pointer input, exclusively held for one navigation run
#[async_trait]
pub trait InputChannel: Send + Sync {
    async fn attach(&self) -> Result<()>;

    async fn detach(&self) -> Result<()>;

    async fn hover(&self, point: Point) -> Result<()>;

    async fn click(&self, point: Point) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_toward() {
        assert_eq!(Direction::toward(0, 2), Direction::Next);
        assert_eq!(Direction::toward(2, 0), Direction::Previous);
    }

    #[test]
    fn test_indicator_current_index() {
        let indicator = BranchIndicator {
            dom_index: 0,
            current: 2,
            total: 3,
            wrapper_text: String::new(),
            preceding_text: String::new(),
            hover_point: Point::new(1.0, 2.0),
            previous: Some(Point::new(3.0, 4.0)),
            next: None,
            top: 0.0,
        };
        assert_eq!(indicator.current_index(), 1);
        assert_eq!(indicator.button(Direction::Previous), Some(Point::new(3.0, 4.0)));
        assert_eq!(indicator.button(Direction::Next), None);
    }

    #[test]
    fn test_locator_serde() {
        let locator: MessageLocator = serde_json::from_str(r#"{"by":"id","value":"m1"}"#).unwrap();
        assert_eq!(locator, MessageLocator::Id("m1".to_string()));
    }
}
