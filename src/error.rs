use thiserror::Error;

/// Errors produced while building conversation trees or driving the host page
#[derive(Debug, Error)]
pub enum ChatTreeError {
    /// Failed to launch the browser process
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Failed to connect to an existing browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// A tab-level operation failed (lookup, activation, close)
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// A script injected into the host page failed to run
    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    /// A script ran but returned something we could not interpret
    #[error("Script returned an invalid result: {0}")]
    ScriptResultInvalid(String),

    /// A node, control, textarea or button could not be found after bounded retries
    #[error("{role} not found: {detail}")]
    NotFound { role: String, detail: String },

    /// Fuzzy matching produced no candidate above the acceptance threshold
    #[error("No branch control matched above threshold (best score {best_score}, {candidates} candidates)")]
    AmbiguousMatch { best_score: i32, candidates: usize },

    /// The trusted-input channel is held by someone else
    #[error("Input channel contention: {0}")]
    ChannelContention(String),

    /// Detach was requested on a channel that is not attached
    #[error("Input channel not attached")]
    ChannelNotAttached,

    /// The trusted-input channel rejected a command
    #[error("Input channel command failed: {0}")]
    ChannelFailed(String),

    /// A bounded wait expired
    #[error("Timed out: {context}")]
    Timeout { context: String },

    /// The content navigator ran out of iterations
    #[error(
        "Exceeded max iterations ({iterations}) while navigating branches. Available totals: {available_totals:?}. {pending}"
    )]
    NavigationExhausted {
        iterations: usize,
        pending: String,
        available_totals: Vec<u32>,
    },

    /// A single level of an identifier-variant plan failed
    #[error("Navigation failed at level {level} for node {node_id}: {reason}")]
    LevelFailed {
        node_id: String,
        level: usize,
        reason: String,
    },

    /// Input rejected before any DOM interaction
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Provider payload could not be understood
    #[error("Invalid conversation payload: {0}")]
    InvalidPayload(String),

    /// The page or payload belongs to a provider we do not handle
    #[error("Unsupported chat provider: {0}")]
    UnsupportedProvider(String),

    /// An action invoked through the registry failed
    #[error("Action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatTreeError {
    /// Shorthand for [`ChatTreeError::NotFound`]
    pub fn not_found(role: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::NotFound { role: role.into(), detail: detail.into() }
    }

    /// Whether this error is the expected outcome of detaching an idle channel
    pub fn is_not_attached(&self) -> bool {
        match self {
            Self::ChannelNotAttached => true,
            Self::ChannelFailed(message) => {
                let message = message.to_lowercase();
                message.contains("not attached") || message.contains("no debugger") || message.contains("cannot detach")
            }
            _ => false,
        }
    }
}

/// Result type alias for chat-tree operations
pub type Result<T> = std::result::Result<T, ChatTreeError>;
