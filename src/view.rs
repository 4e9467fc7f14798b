//! Conversation view
//!
//! [`ConversationView`] owns one built tree and keeps it in step with the
//! host page: it refreshes visibility, navigates to nodes, reveals them and
//! edits or answers messages. Everything that clicks goes through the
//! [`ActionQueue`] carried by its [`PageHandles`].

use crate::config::NavigationConfig;
use crate::conversation::{Addressing, Conversation, Provider};
use crate::error::{ChatTreeError, Result};
use crate::navigator::{Composer, ContentNavigator, IdentifierNavigator, NavigationReport};
use crate::oracle::{VisibilityOracle, find_container};
use crate::page::{ChromeInputChannel, ChromePage, ComposerPage, ContentPage, InputChannel, MessageIdPage, MessageLocator};
use crate::planner::{LastActiveChildMap, NavigationPlan, NavigationStep, plan, plan_steps};
use crate::queue::ActionQueue;
use crate::tree::{ConversationTree, Edge, TreeBuilder};
use headless_chrome::Tab;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The page collaborators a view drives.
///
/// Clones share the input channel and the action queue, so every view
/// built from clones of one set of handles takes turns on the page.
#[derive(Clone, Default)]
pub struct PageHandles {
    pub content: Option<Arc<dyn ContentPage>>,
    pub by_id: Option<Arc<dyn MessageIdPage>>,
    pub composer: Option<Arc<dyn ComposerPage>>,
    pub input: Option<Arc<dyn InputChannel>>,
    pub queue: ActionQueue,
}

impl PageHandles {
    /// Handles backed by one object implementing every page seam
    pub fn from_host<H>(host: Arc<H>, input: Arc<dyn InputChannel>) -> Self
    where
        H: ContentPage + MessageIdPage + ComposerPage + 'static,
    {
        Self {
            content: Some(host.clone()),
            by_id: Some(host.clone()),
            composer: Some(host),
            input: Some(input),
            queue: ActionQueue::new(),
        }
    }

    /// Handles for a live Chrome tab
    pub fn chrome(tab: Arc<Tab>) -> Self {
        let input: Arc<dyn InputChannel> = Arc::new(ChromeInputChannel::new(Arc::clone(&tab)));
        Self::from_host(Arc::new(ChromePage::new(tab)), input)
    }

    fn content(&self) -> Result<&Arc<dyn ContentPage>> {
        self.content.as_ref().ok_or_else(|| missing_handle("content page"))
    }

    fn by_id(&self) -> Result<&Arc<dyn MessageIdPage>> {
        self.by_id.as_ref().ok_or_else(|| missing_handle("message id page"))
    }

    fn composer(&self) -> Result<&Arc<dyn ComposerPage>> {
        self.composer.as_ref().ok_or_else(|| missing_handle("composer"))
    }

    fn input(&self) -> Result<&Arc<dyn InputChannel>> {
        self.input.as_ref().ok_or_else(|| missing_handle("input channel"))
    }

    /// The visibility oracle matching a provider's addressing
    pub fn oracle(&self, provider: Provider) -> Result<VisibilityOracle> {
        Ok(match provider.addressing() {
            Addressing::ById => VisibilityOracle::ById(Arc::clone(self.by_id()?)),
            Addressing::ByContent => VisibilityOracle::ByContent(Arc::clone(self.content()?)),
        })
    }
}

fn missing_handle(what: &str) -> ChatTreeError {
    ChatTreeError::Config(format!("no {} configured for this view", what))
}

/// Result of a go-to-node run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoToOutcome {
    pub target_id: String,
    pub clicks: usize,
    /// Whether the target is rendered after the visibility refresh
    pub visible: bool,
}

/// A built conversation tree bound to the page it came from
pub struct ConversationView {
    tree: ConversationTree,
    edges: Vec<Edge>,
    title: String,
    pages: PageHandles,
    hints: LastActiveChildMap,
    queue: ActionQueue,
    config: NavigationConfig,
}

impl ConversationView {
    /// Build the tree for `conversation` and read initial visibility from the page
    pub async fn load(conversation: &Conversation, pages: PageHandles, config: NavigationConfig) -> Result<Self> {
        let provider = conversation.provider();
        let oracle = pages.oracle(provider)?;

        if provider.addressing() == Addressing::ById {
            // Lazily rendered turns only report their ids once hovered
            if let Err(e) = pages.by_id()?.prime_all().await {
                log::warn!("Failed to prime conversation turns: {}", e);
            }
        }

        let builder = TreeBuilder::with_config(provider, &config);
        let (tree, edges) = builder
            .build(conversation.raw_messages(), move |fingerprints| async move {
                oracle.check_hidden(&fingerprints).await
            })
            .await?;

        log::info!(
            "Loaded {} conversation '{}' with {} messages ({} rendered)",
            provider.as_str(),
            conversation.title(),
            tree.len().saturating_sub(1),
            tree.visible_ids().len()
        );

        Ok(Self {
            tree,
            edges,
            title: conversation.title().to_string(),
            queue: pages.queue.clone(),
            pages,
            hints: LastActiveChildMap::new(),
            config,
        })
    }

    /// Share a last-active-child map across reloads
    pub fn with_hints(mut self, hints: LastActiveChildMap) -> Self {
        self.hints = hints;
        self
    }

    pub fn tree(&self) -> &ConversationTree {
        &self.tree
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn provider(&self) -> Provider {
        self.tree.provider
    }

    pub fn hints(&self) -> &LastActiveChildMap {
        &self.hints
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// "Absent from page" flags for arbitrary fingerprints
    pub async fn check_hidden(&self, fingerprints: &[String]) -> Result<Vec<bool>> {
        self.pages.oracle(self.provider())?.check_hidden(fingerprints).await
    }

    /// Re-read which nodes are rendered and update `hidden` flags.
    ///
    /// On content-addressed hosts, nodes that dropped out of view together
    /// with their parent are flagged as previously visited.
    pub async fn refresh_visibility(&mut self) -> Result<()> {
        let previous = self.tree.visible_ids();
        let hidden = self.check_hidden(&self.tree.message_fingerprints()).await?;
        self.tree.apply_hidden(&hidden);

        if self.provider().addressing() == Addressing::ByContent {
            let flagged = self.tree.mark_previously_visited(&previous);
            log::debug!("{} node(s) marked as previously visited", flagged);
        }
        Ok(())
    }

    pub fn plan(&self, target_id: &str) -> NavigationPlan {
        plan(&self.tree, target_id, &self.config)
    }

    pub fn steps(&self, target_id: &str) -> Vec<NavigationStep> {
        plan_steps(&self.tree, target_id, &self.hints)
    }

    /// Execute id-addressed steps through the queue. Returns clicks made.
    pub async fn execute_steps(&self, steps: &[NavigationStep]) -> Result<usize> {
        let page = Arc::clone(self.pages.by_id()?);
        let config = &self.config;
        self.queue
            .enqueue("execute steps", || async move {
                IdentifierNavigator::new(page.as_ref(), config).execute(steps).await
            })
            .await
    }

    /// Execute a content plan through the queue
    pub async fn execute_plan(&self, plan: &NavigationPlan) -> Result<NavigationReport> {
        let page = Arc::clone(self.pages.content()?);
        let input = Arc::clone(self.pages.input()?);
        let config = &self.config;
        self.queue
            .enqueue("execute plan", || async move {
                ContentNavigator::new(page.as_ref(), input.as_ref(), config).navigate(plan).await
            })
            .await
    }

    /// Make `target_id` part of the rendered path, then refresh visibility
    pub async fn go_to(&mut self, target_id: &str) -> Result<GoToOutcome> {
        if !self.tree.contains(target_id) {
            return Err(ChatTreeError::MalformedInput(format!("unknown node {}", target_id)));
        }

        let clicks = match self.provider().addressing() {
            Addressing::ById => {
                let steps = self.steps(target_id);
                self.execute_steps(&steps).await?
            }
            Addressing::ByContent => {
                let plan = self.plan(target_id);
                self.execute_plan(&plan).await?.clicks
            }
        };

        self.hints.record_path(&self.tree.path_to(target_id));
        self.refresh_visibility().await?;

        let visible = self.tree.get(target_id).is_some_and(|n| n.is_visible());
        Ok(GoToOutcome { target_id: target_id.to_string(), clicks, visible })
    }

    /// Scroll a node's rendered message into view. `false` when not rendered.
    pub async fn reveal(&self, node_id: &str) -> Result<bool> {
        let node = self
            .tree
            .get(node_id)
            .ok_or_else(|| ChatTreeError::MalformedInput(format!("unknown node {}", node_id)))?;

        match self.provider().addressing() {
            Addressing::ById => self.pages.by_id()?.reveal_message(node_id).await,
            Addressing::ByContent => {
                let page = self.pages.content()?;
                let containers = page.content_containers().await?;
                match find_container(&containers, &node.content.text) {
                    Some(index) => page.reveal_container(index).await,
                    None => Ok(false),
                }
            }
        }
    }

    /// How the host page finds a node's message
    pub fn locator(&self, node_id: &str) -> Option<MessageLocator> {
        let node = self.tree.get(node_id).filter(|n| !n.is_root())?;
        Some(match self.provider().addressing() {
            Addressing::ById => MessageLocator::Id(node.id.clone()),
            Addressing::ByContent => MessageLocator::Text(node.content.text.clone()),
        })
    }

    /// Replace a message's text through the host's edit control
    pub async fn edit(&self, node_id: &str, text: &str) -> Result<()> {
        let locator = self
            .locator(node_id)
            .ok_or_else(|| ChatTreeError::MalformedInput(format!("cannot edit node {}", node_id)))?;
        let composer = Arc::clone(self.pages.composer()?);
        let addressing = self.provider().addressing();
        let config = &self.config;
        self.queue
            .enqueue("edit message", || async move {
                Composer::new(composer.as_ref(), addressing, config).edit(&locator, text).await
            })
            .await
    }

    /// Start a new reply branch under `node_id` by editing its first
    /// rendered child
    pub async fn respond(&self, node_id: &str, text: &str) -> Result<()> {
        if !self.tree.contains(node_id) {
            return Err(ChatTreeError::MalformedInput(format!("unknown node {}", node_id)));
        }
        let children: Vec<MessageLocator> =
            self.tree.children_of(node_id).filter_map(|child| self.locator(&child.id)).collect();
        let composer = Arc::clone(self.pages.composer()?);
        let addressing = self.provider().addressing();
        let config = &self.config;
        self.queue
            .enqueue("respond to message", || async move {
                Composer::new(composer.as_ref(), addressing, config).respond(&children, text).await
            })
            .await
    }
}
