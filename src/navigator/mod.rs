//! Navigation executors
//!
//! - [`ContentNavigator`]: fuzzy-matched branch controls, trusted clicks,
//!   virtualization-aware scrolling
//! - [`IdentifierNavigator`]: fixed controls next to id-tagged messages
//! - [`Composer`]: message edit and respond
//!
//! The bounded [`retry`] helper and the scoped [`with_trusted_input`]
//! acquisition are shared by all three.

pub mod channel;
pub mod compose;
pub mod content;
pub mod identifier;
pub mod retry;
pub mod scoring;

pub use channel::with_trusted_input;
pub use compose::Composer;
pub use content::{ContentNavigator, NavigationReport};
pub use identifier::IdentifierNavigator;
pub use retry::retry;
pub use scoring::{LevelMatcher, ScoredIndicator};
