//! chat-tree CLI
//!
//! Builds the branch tree of a chat conversation from its JSON payload and
//! drives the open chat tab to any node.

use anyhow::{Context, bail};
use chat_tree::{
    ActionContext, ActionRegistry, ActionResult, BrowserSession, ConnectionOptions, Conversation, ConversationView,
    LaunchOptions, NavigationConfig, TreeBuilder, plan,
};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chat-tree")]
#[command(version)]
#[command(about = "Navigate the branches of an AI chat conversation", long_about = None)]
struct Cli {
    /// Conversation payload as fetched from the chat host's API
    #[arg(long, short = 'p', value_name = "FILE")]
    payload: PathBuf,

    /// DevTools WebSocket URL of a running browser (default: launch one)
    #[arg(long, value_name = "URL")]
    ws_url: Option<String>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Persistent browser profile directory, for an existing chat login
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Open this conversation URL after launching
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Navigation tuning as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the conversation tree
    Tree {
        /// Skip the visibility check; every node is reported hidden
        #[arg(long)]
        offline: bool,
    },
    /// Print the navigation plan for a node without touching the page
    Plan { node_id: String },
    /// Print id-host click steps for a node
    Steps { node_id: String },
    /// Navigate the chat tab to a node
    Goto {
        node_id: String,
        /// Do not scroll the node into view afterwards
        #[arg(long)]
        no_reveal: bool,
    },
    /// Print which nodes are rendered
    Visibility,
    /// Scroll a rendered node into view
    Reveal { node_id: String },
    /// Replace a message's text
    Edit { node_id: String, text: String },
    /// Start a new reply branch under a message
    Respond { node_id: String, text: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let config = match &cli.config {
        Some(path) => NavigationConfig::from_json_file(path)?,
        None => NavigationConfig::default(),
    };

    let raw = std::fs::read_to_string(&cli.payload)
        .with_context(|| format!("Failed to read payload {}", cli.payload.display()))?;
    let conversation = Conversation::from_json(&raw)?;

    // Commands that never touch the page
    match &cli.command {
        Command::Tree { offline: true } => {
            let tree = TreeBuilder::with_config(conversation.provider(), &config).assemble(conversation.raw_messages());
            return print_json(&json!({ "title": conversation.title(), "nodes": tree.nodes().collect::<Vec<_>>(), "edges": tree.edges() }));
        }
        Command::Plan { node_id } => {
            let tree = TreeBuilder::with_config(conversation.provider(), &config).assemble(conversation.raw_messages());
            if !tree.contains(node_id) {
                bail!("Unknown node {}", node_id);
            }
            return print_json(&serde_json::to_value(plan(&tree, node_id, &config))?);
        }
        _ => {}
    }

    // The payload decides the provider; only a tab of that host will do
    let session = open_session(&cli)?;
    let (pages, _) = session.page_handles(Some(conversation.provider())).with_context(|| {
        format!("No {} tab open for this conversation", conversation.provider().as_str())
    })?;

    let mut view = ConversationView::load(&conversation, pages, config).await?;

    let (action, params) = match &cli.command {
        Command::Tree { .. } => {
            return print_json(&json!({ "title": view.title(), "nodes": view.tree().nodes().collect::<Vec<_>>(), "edges": view.edges() }));
        }
        Command::Steps { node_id } => {
            return print_json(&serde_json::to_value(view.steps(node_id))?);
        }
        Command::Plan { node_id } => {
            return print_json(&serde_json::to_value(view.plan(node_id))?);
        }
        Command::Goto { node_id, no_reveal } => ("go_to_node", json!({ "node_id": node_id, "reveal": !no_reveal })),
        Command::Visibility => ("refresh_visibility", json!({})),
        Command::Reveal { node_id } => ("go_to_target", json!({ "node_id": node_id })),
        Command::Edit { node_id, text } => ("edit_message", json!({ "node_id": node_id, "text": text })),
        Command::Respond { node_id, text } => ("respond_to_message", json!({ "node_id": node_id, "text": text })),
    };

    let registry = ActionRegistry::with_defaults();
    let mut context = ActionContext::new(&mut view);
    let result = registry.execute(action, params, &mut context).await;
    report(action, result)
}

fn open_session(cli: &Cli) -> anyhow::Result<BrowserSession> {
    if let Some(ws_url) = &cli.ws_url {
        log::info!("Connecting to browser at {}", ws_url);
        return Ok(BrowserSession::connect(ConnectionOptions::new(ws_url.clone()))?);
    }

    let mut options = LaunchOptions::new().headless(!cli.headed);
    if let Some(dir) = &cli.user_data_dir {
        options = options.user_data_dir(dir);
    }
    let session = BrowserSession::launch(options)?;

    if let Some(url) = &cli.url {
        session.navigate(url)?;
    }
    Ok(session)
}

fn report(action: &str, result: ActionResult) -> anyhow::Result<()> {
    print_json(&serde_json::to_value(&result)?)?;
    if !result.success {
        bail!("{} failed: {}", action, result.error.as_deref().unwrap_or("not found"));
    }
    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
