//! Conversation tree
//!
//! - [`TreeBuilder`]: turns flat provider messages into a rooted tree
//! - [`ConversationTree`]: nodes with parent/children links and visibility flags

pub mod builder;
pub mod node;

pub use builder::{NO_CONTENT, TreeBuilder};
pub use node::{ConversationTree, Edge, Node, NodeContent, ROOT_ID, ROOT_TEXT, Role};
