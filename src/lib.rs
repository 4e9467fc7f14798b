//! # chat-tree
//!
//! Branch navigation for AI chat conversations, driving the chat tab over the
//! Chrome DevTools Protocol (CDP).
//!
//! Chat hosts store every edit and regeneration as a sibling branch but only
//! render one path at a time. This crate rebuilds the full conversation tree
//! from the host's payload, tells which nodes are on the rendered path, and
//! clicks the host's own previous/next controls until a chosen node is shown.
//!
//! ## Features
//!
//! - **Tree building**: Claude and ChatGPT payloads flattened into one rooted tree
//! - **Visibility**: per-node "rendered or not", by message id or by tolerant text matching
//! - **Planning**: the sibling selection needed at every branching ancestor
//! - **Navigation**: exact clicks on id-tagged hosts; fuzzy-matched trusted clicks with
//!   virtualization-aware scrolling on content-matched hosts
//! - **Editing**: edit a message or start a new reply branch under it
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use chat_tree::{BrowserSession, ConnectionOptions, Conversation, ConversationView, NavigationConfig};
//!
//! # async fn run() -> chat_tree::Result<()> {
//! let session = BrowserSession::connect(ConnectionOptions::new("ws://127.0.0.1:9222/devtools/browser/..."))?;
//! let (pages, _provider) = session.page_handles(None)?;
//!
//! let payload = std::fs::read_to_string("conversation.json")?;
//! let conversation = Conversation::from_json(&payload)?;
//! let mut view = ConversationView::load(&conversation, pages, NavigationConfig::default()).await?;
//!
//! let outcome = view.go_to("2b7c0d4e-message-id").await?;
//! println!("{} clicks, visible: {}", outcome.clicks, outcome.visible);
//! # Ok(())
//! # }
//! ```
//!
//! ### Using the Action System
//!
//! ```rust,no_run
//! # use chat_tree::{ActionContext, ActionRegistry, ConversationView};
//! # use serde_json::json;
//! # async fn run(view: &mut ConversationView) {
//! let registry = ActionRegistry::with_defaults();
//! let mut context = ActionContext::new(view);
//!
//! let result = registry.execute("go_to_node", json!({"node_id": "2b7c0d4e"}), &mut context).await;
//! if !result.success {
//!     eprintln!("navigation failed: {:?}", result.error);
//! }
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`conversation`]: provider payloads
//! - [`tree`]: the conversation tree and its builder
//! - [`planner`]: navigation plans, id-host steps, last-active hints
//! - [`oracle`]: text normalization and visibility checks
//! - [`page`]: page seams and their CDP implementation
//! - [`navigator`]: navigation executors and the message composer
//! - [`queue`]: serializes page-driving actions
//! - [`view`]: a tree bound to its page
//! - [`actions`]: named actions with a uniform result contract
//! - [`browser`]: browser launch and connection
//! - [`error`]: error types

pub mod actions;
pub mod browser;
pub mod config;
pub mod conversation;
pub mod error;
pub mod navigator;
pub mod oracle;
pub mod page;
pub mod planner;
pub mod queue;
pub mod tree;
pub mod view;

pub use actions::{Action, ActionContext, ActionRegistry, ActionResult};
pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use config::NavigationConfig;
pub use conversation::{Addressing, Conversation, Provider, RawMessage};
pub use error::{ChatTreeError, Result};
pub use navigator::{Composer, ContentNavigator, IdentifierNavigator, NavigationReport};
pub use oracle::VisibilityOracle;
pub use page::{BranchIndicator, ContentPage, ComposerPage, InputChannel, MessageIdPage, MessageLocator};
pub use planner::{LastActiveChildMap, NavigationDecision, NavigationPlan, NavigationStep, plan, plan_steps};
pub use queue::ActionQueue;
pub use tree::{ConversationTree, Edge, Node, Role, TreeBuilder};
pub use view::{ConversationView, GoToOutcome, PageHandles};
