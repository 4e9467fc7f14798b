//! Path planning
//!
//! Given a target node, work out which sibling must be selected at every
//! branching ancestor. Content-addressed hosts get a [`NavigationPlan`] of
//! fuzzy-matchable decisions; id-addressed hosts get [`NavigationStep`]s with
//! exact click counts.

pub mod fingerprint;
pub mod hints;
pub mod plan;
pub mod steps;

pub use fingerprint::{anchor_excerpt, fingerprints, normalize_whitespace, primary_fingerprint};
pub use hints::{ChildHints, LastActiveChildMap};
pub use plan::{NavigationDecision, NavigationPlan, plan};
pub use steps::{NavigationStep, plan_steps};
