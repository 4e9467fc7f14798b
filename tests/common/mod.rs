//! In-memory chat host used by the integration tests.
//!
//! The host renders one path through a conversation tree: starting at the
//! root it follows the selected child of every node (the first child unless
//! a branch control moved it). Each rendered message is a block of fixed
//! height; blocks whose parent has several children carry a "n / total"
//! indicator. An optional render margin makes the host virtualize blocks
//! that are far from the viewport, and an optional markdown mode renders
//! stored text the way a reader sees it instead of verbatim.

#![allow(dead_code)]

use async_trait::async_trait;
use chat_tree::error::{ChatTreeError, Result};
use chat_tree::page::{
    BranchIndicator, ClickOutcome, ComposerPage, ContentPage, Direction, EditOutcome, InputChannel, MessageIdPage,
    MessageLocator, Point, ScrollPosition,
};
use chat_tree::tree::{ConversationTree, ROOT_ID, Role, TreeBuilder};
use chat_tree::{Conversation, RawMessage};
use regex::Regex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const BLOCK_HEIGHT: f64 = 300.0;
pub const VIEWPORT_HEIGHT: f64 = 400.0;

const PREVIOUS_X: f64 = 80.0;
const NEXT_X: f64 = 120.0;
const HOVER_X: f64 = 100.0;

#[derive(Default)]
struct HostState {
    selected: HashMap<String, usize>,
    scroll_top: f64,
    hovered_block: Option<usize>,
    attached: bool,
    busy_attaches: usize,
    editor: Option<String>,
    editor_text: Option<String>,
}

/// A simulated chat page. Also acts as its own trusted-input channel.
pub struct FakeHost {
    tree: ConversationTree,
    state: Mutex<HostState>,
    render_margin: Option<f64>,
    buttons_need_hover: bool,
    opens_newest: bool,
    renders_markdown: bool,

    pub clicks: Mutex<usize>,
    pub attaches: Mutex<usize>,
    pub contentions: Mutex<usize>,
    pub primes: Mutex<usize>,
    pub submitted: Mutex<Vec<(String, String)>>,
}

struct Block<'a> {
    index: usize,
    id: &'a str,
    text: &'a str,
    indicator: Option<(usize, usize)>,
}

impl FakeHost {
    pub fn new(tree: ConversationTree) -> Self {
        Self {
            tree,
            state: Mutex::new(HostState::default()),
            render_margin: None,
            buttons_need_hover: false,
            opens_newest: false,
            renders_markdown: false,
            clicks: Mutex::new(0),
            attaches: Mutex::new(0),
            contentions: Mutex::new(0),
            primes: Mutex::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Only render blocks within `margin` px of the viewport
    pub fn virtualized(mut self, margin: f64) -> Self {
        self.render_margin = Some(margin);
        self
    }

    /// Branch buttons only appear on the hovered block
    pub fn buttons_on_hover(mut self) -> Self {
        self.buttons_need_hover = true;
        self
    }

    /// Unselected parents show their last child, as id-tagged hosts do
    pub fn opens_newest(mut self) -> Self {
        self.opens_newest = true;
        self
    }

    /// Show stored markdown as rendered text: no emphasis, code or heading
    /// markers, link labels without their targets
    pub fn renders_markdown(mut self) -> Self {
        self.renders_markdown = true;
        self
    }

    /// The next `n` attaches fail as if another debugger held the tab
    pub fn busy_for(self, n: usize) -> Self {
        self.state.lock().unwrap().busy_attaches = n;
        self
    }

    pub fn select(&self, parent: &str, index: usize) {
        self.state.lock().unwrap().selected.insert(parent.to_string(), index);
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().unwrap().attached
    }

    pub fn click_count(&self) -> usize {
        *self.clicks.lock().unwrap()
    }

    pub fn scroll_top(&self) -> f64 {
        self.state.lock().unwrap().scroll_top
    }

    /// Ids of the rendered path, root excluded
    pub fn path(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        self.path_with(&state).into_iter().map(str::to_string).collect()
    }

    fn path_with<'a>(&'a self, state: &HostState) -> Vec<&'a str> {
        let mut path = Vec::new();
        let mut current = ROOT_ID;
        while let Some(node) = self.tree.get(current) {
            if node.children.is_empty() {
                break;
            }
            let last = node.children.len() - 1;
            let default = if self.opens_newest { last } else { 0 };
            let index = state.selected.get(current).copied().unwrap_or(default).min(last);
            current = node.children[index].as_str();
            path.push(current);
            if path.len() > self.tree.len() {
                break;
            }
        }
        path
    }

    fn blocks_with<'a>(&'a self, state: &HostState) -> Vec<Block<'a>> {
        self.path_with(state)
            .into_iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let node = self.tree.get(id)?;
                let parent = self.tree.parent_of(id)?;
                let indicator = (parent.children.len() > 1)
                    .then(|| (parent.child_index(id).unwrap_or(0) + 1, parent.children.len()));
                Some(Block { index, id: node.id.as_str(), text: node.content.text.as_str(), indicator })
            })
            .collect()
    }

    /// Text of a block as the page shows it
    fn rendered(&self, text: &str) -> String {
        if !self.renders_markdown {
            return text.to_string();
        }
        let unheaded: Vec<&str> = text.lines().map(|line| line.trim_start_matches('#').trim_start()).collect();
        let plain = unheaded.join("\n").replace(['*', '`'], "");
        let link = Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap();
        link.replace_all(&plain, "$1").into_owned()
    }

    fn max_scroll(&self, state: &HostState) -> f64 {
        (self.path_with(state).len() as f64 * BLOCK_HEIGHT - VIEWPORT_HEIGHT).max(0.0)
    }

    fn is_rendered(&self, state: &HostState, block: usize) -> bool {
        let Some(margin) = self.render_margin else {
            return true;
        };
        let top = block as f64 * BLOCK_HEIGHT;
        let bottom = top + BLOCK_HEIGHT;
        bottom >= state.scroll_top - margin && top <= state.scroll_top + VIEWPORT_HEIGHT + margin
    }

    fn indicators_with(&self, state: &HostState) -> Vec<BranchIndicator> {
        let blocks = self.blocks_with(state);
        let mut indicators = Vec::new();
        for block in &blocks {
            let Some((current, total)) = block.indicator else {
                continue;
            };
            if !self.is_rendered(state, block.index) {
                continue;
            }
            let top = block.index as f64 * BLOCK_HEIGHT - state.scroll_top;
            let button_y = top + BLOCK_HEIGHT - 20.0;
            let show_buttons = !self.buttons_need_hover || state.hovered_block == Some(block.index);
            let preceding = if block.index == 0 { "" } else { blocks[block.index - 1].text };
            indicators.push(BranchIndicator {
                dom_index: indicators.len(),
                current,
                total,
                wrapper_text: self.rendered(block.text),
                preceding_text: self.rendered(preceding),
                hover_point: Point::new(HOVER_X, top + 20.0),
                previous: show_buttons.then(|| Point::new(PREVIOUS_X, button_y)),
                next: show_buttons.then(|| Point::new(NEXT_X, button_y)),
                top,
            });
        }
        indicators
    }

    fn block_at(&self, state: &HostState, point: Point) -> Option<usize> {
        let y = point.y + state.scroll_top;
        let index = (y / BLOCK_HEIGHT).floor();
        (index >= 0.0).then_some(index as usize).filter(|i| *i < self.path_with(state).len())
    }

    fn move_selection(&self, state: &mut HostState, node_id: &str, direction: Direction) -> bool {
        let Some(parent) = self.tree.parent_of(node_id) else {
            return false;
        };
        if parent.children.len() < 2 {
            return false;
        }
        let Some(current) = parent.child_index(node_id) else {
            return false;
        };
        if !self.path_with(state).contains(&node_id) {
            return false;
        }
        let next = match direction {
            Direction::Previous => current.saturating_sub(1),
            Direction::Next => (current + 1).min(parent.children.len() - 1),
        };
        state.selected.insert(parent.id.clone(), next);
        true
    }

    fn locate(&self, state: &HostState, locator: &MessageLocator) -> Option<String> {
        let path = self.path_with(state);
        match locator {
            MessageLocator::Id(id) => path.into_iter().find(|p| p == id).map(str::to_string),
            MessageLocator::Text(text) => path
                .into_iter()
                .find(|p| self.tree.get(p).is_some_and(|n| n.content.text == *text))
                .map(str::to_string),
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl ContentPage for FakeHost {
    async fn message_texts(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(self
            .blocks_with(&state)
            .iter()
            .filter(|b| self.is_rendered(&state, b.index))
            .map(|b| self.rendered(b.text))
            .collect())
    }

    async fn branch_indicators(&self) -> Result<Vec<BranchIndicator>> {
        let state = self.state.lock().unwrap();
        Ok(self.indicators_with(&state))
    }

    async fn reveal_indicator(&self, dom_index: usize) -> Result<Option<BranchIndicator>> {
        let mut state = self.state.lock().unwrap();
        let Some(indicator) = self.indicators_with(&state).into_iter().nth(dom_index) else {
            return Ok(None);
        };
        let block = ((indicator.top + state.scroll_top) / BLOCK_HEIGHT).round();
        let centre = block * BLOCK_HEIGHT + BLOCK_HEIGHT / 2.0 - VIEWPORT_HEIGHT / 2.0;
        let max = self.max_scroll(&state);
        state.scroll_top = centre.clamp(0.0, max);

        let wanted = block as usize;
        Ok(self
            .indicators_with(&state)
            .into_iter()
            .find(|i| ((i.top + state.scroll_top) / BLOCK_HEIGHT).round() as usize == wanted))
    }

    async fn content_containers(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(self
            .blocks_with(&state)
            .iter()
            .filter(|b| self.is_rendered(&state, b.index))
            .map(|b| format!("<p>{}</p>", escape_html(&self.rendered(b.text))))
            .collect())
    }

    async fn reveal_container(&self, index: usize) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(index < self.blocks_with(&state).iter().filter(|b| self.is_rendered(&state, b.index)).count())
    }

    async fn viewport_height(&self) -> Result<f64> {
        Ok(VIEWPORT_HEIGHT)
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.state.lock().unwrap().scroll_top = 0.0;
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<Option<ScrollPosition>> {
        let mut state = self.state.lock().unwrap();
        let max = self.max_scroll(&state);
        state.scroll_top = (state.scroll_top + dy).clamp(0.0, max);
        Ok(Some(ScrollPosition { scroll_top: state.scroll_top, max_scroll_top: max }))
    }
}

#[async_trait]
impl MessageIdPage for FakeHost {
    async fn messages_present(&self, ids: &[String]) -> Result<Vec<bool>> {
        let state = self.state.lock().unwrap();
        let path = self.path_with(&state);
        Ok(ids.iter().map(|id| path.contains(&id.as_str())).collect())
    }

    async fn prime_controls(&self, _node_id: &str) -> Result<()> {
        *self.primes.lock().unwrap() += 1;
        Ok(())
    }

    async fn prime_all(&self) -> Result<()> {
        *self.primes.lock().unwrap() += 1;
        Ok(())
    }

    async fn click_branch_button(
        &self,
        node_id: &str,
        _role: Role,
        direction: Direction,
        _settle: Duration,
    ) -> Result<ClickOutcome> {
        let mut state = self.state.lock().unwrap();
        if !self.path_with(&state).contains(&node_id) {
            return Ok(ClickOutcome::Missing);
        }
        if !self.move_selection(&mut state, node_id, direction) {
            return Ok(ClickOutcome::Missing);
        }
        *self.clicks.lock().unwrap() += 1;
        Ok(ClickOutcome::Settled)
    }

    async fn reveal_message(&self, node_id: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(self.path_with(&state).contains(&node_id))
    }
}

#[async_trait]
impl ComposerPage for FakeHost {
    async fn click_edit_button(&self, locator: &MessageLocator) -> Result<EditOutcome> {
        let mut state = self.state.lock().unwrap();
        match self.locate(&state, locator) {
            Some(id) => {
                state.editor = Some(id);
                state.editor_text = None;
                Ok(EditOutcome::Clicked)
            }
            None => Ok(EditOutcome::MessageMissing),
        }
    }

    async fn fill_editor(&self, locator: &MessageLocator, text: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.editor.is_none() || state.editor != self.locate(&state, locator) {
            return Ok(false);
        }
        state.editor_text = Some(text.to_string());
        Ok(true)
    }

    async fn submit_edit(&self, _locator: &MessageLocator, _settle: Option<Duration>) -> Result<ClickOutcome> {
        let mut state = self.state.lock().unwrap();
        match (state.editor.take(), state.editor_text.take()) {
            (Some(id), Some(text)) => {
                self.submitted.lock().unwrap().push((id, text));
                Ok(ClickOutcome::Settled)
            }
            _ => Ok(ClickOutcome::Missing),
        }
    }
}

#[async_trait]
impl InputChannel for FakeHost {
    async fn attach(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.attached || state.busy_attaches > 0 {
            state.busy_attaches = state.busy_attaches.saturating_sub(1);
            *self.contentions.lock().unwrap() += 1;
            return Err(ChatTreeError::ChannelContention("Another debugger is already attached".into()));
        }
        state.attached = true;
        *self.attaches.lock().unwrap() += 1;
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.attached {
            return Err(ChatTreeError::ChannelNotAttached);
        }
        state.attached = false;
        state.hovered_block = None;
        Ok(())
    }

    async fn hover(&self, point: Point) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.attached {
            return Err(ChatTreeError::ChannelNotAttached);
        }
        state.hovered_block = self.block_at(&state, point);
        Ok(())
    }

    async fn click(&self, point: Point) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.attached {
            return Err(ChatTreeError::ChannelNotAttached);
        }
        let hit = self.indicators_with(&state).into_iter().find_map(|indicator| {
            let wrapper = self.block_at(&state, indicator.hover_point)?;
            if indicator.previous == Some(point) {
                Some((wrapper, Direction::Previous))
            } else if indicator.next == Some(point) {
                Some((wrapper, Direction::Next))
            } else {
                None
            }
        });
        let Some((block, direction)) = hit else {
            return Ok(());
        };
        let Some(node_id) = self.path_with(&state).get(block).map(|s| s.to_string()) else {
            return Ok(());
        };
        self.move_selection(&mut state, &node_id, direction);
        *self.clicks.lock().unwrap() += 1;
        Ok(())
    }
}

/// `(id, parent, role, text)` rows
pub type Row<'a> = (&'a str, Option<&'a str>, Role, &'a str);

pub fn build_tree(provider: chat_tree::Provider, rows: &[Row<'_>]) -> ConversationTree {
    TreeBuilder::new(provider).assemble(
        rows.iter().map(|(id, parent, role, text)| RawMessage::new(*id, *parent, *role, *text)).collect(),
    )
}

/// A Claude-shaped payload
pub fn claude_payload(rows: &[Row<'_>]) -> Conversation {
    let messages: Vec<Value> = rows
        .iter()
        .enumerate()
        .map(|(index, (id, parent, role, text))| {
            json!({
                "uuid": id,
                "text": "",
                "content": [{ "type": "text", "text": text }],
                "sender": if *role == Role::User { "human" } else { "assistant" },
                "index": index,
                "created_at": "2024-05-01T10:00:00Z",
                "parent_message_uuid": parent.unwrap_or("00000000-0000-4000-8000-000000000000"),
            })
        })
        .collect();
    Conversation::from_value(json!({ "uuid": "conv", "name": "Monads", "chat_messages": messages }))
        .expect("valid Claude payload")
}

/// A ChatGPT-shaped payload with the host's own message-less root
pub fn chatgpt_payload(rows: &[Row<'_>]) -> Conversation {
    let mut mapping = serde_json::Map::new();
    let top: Vec<&str> = rows.iter().filter(|r| r.1.is_none()).map(|r| r.0).collect();
    mapping.insert(
        "client-root".to_string(),
        json!({ "id": "client-root", "message": null, "parent": null, "children": top }),
    );
    for (id, parent, role, text) in rows {
        let children: Vec<&str> = rows.iter().filter(|r| r.1 == Some(*id)).map(|r| r.0).collect();
        mapping.insert(
            id.to_string(),
            json!({
                "id": id,
                "parent": parent.unwrap_or("client-root"),
                "children": children,
                "message": {
                    "id": id,
                    "author": { "role": role.as_str() },
                    "create_time": 1714557600.0,
                    "content": { "content_type": "text", "parts": [text] },
                    "metadata": { "model_slug": "gpt-4o" }
                }
            }),
        );
    }
    Conversation::from_value(json!({ "title": "Monads", "mapping": mapping })).expect("valid ChatGPT payload")
}

/// Scenario B with markdown in the stored texts
pub fn scenario_b_markdown() -> Vec<Row<'static>> {
    vec![
        ("u", None, Role::User, "What is a **monad**?"),
        ("a1", Some("u"), Role::Assistant, "A monad is a *monoid* in the category of endofunctors."),
        (
            "a2",
            Some("u"),
            Role::Assistant,
            "**Short answer:** think of a monad as a [programmable semicolon](https://example.com/semicolon).",
        ),
        ("f1", Some("a2"), Role::User, "Can you give an example in `Rust`?"),
        ("f2", Some("a2"), Role::User, "How does that relate to `Option`?"),
        ("f3", Some("a2"), Role::User, "## Follow-up\nAnd what about **Result** and the `?` operator?"),
    ]
}

/// Scenario B: one question, two answers, three follow-ups under the second
pub fn scenario_b() -> Vec<Row<'static>> {
    vec![
        ("u", None, Role::User, "What is a monad?"),
        ("a1", Some("u"), Role::Assistant, "A monad is a monoid in the category of endofunctors."),
        ("a2", Some("u"), Role::Assistant, "Think of a monad as a programmable semicolon."),
        ("f1", Some("a2"), Role::User, "Can you give an example in Rust?"),
        ("f2", Some("a2"), Role::User, "How does that relate to Option?"),
        ("f3", Some("a2"), Role::User, "And what about Result and the question mark?"),
    ]
}
