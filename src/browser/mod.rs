//! Browser management
//!
//! Launching or attaching to Chrome and finding the chat tab.

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
