//! Visibility oracle
//!
//! Answers "which of these nodes is absent from the rendered page?". The
//! answer drives the tree's `hidden` flags and the navigator's termination
//! test.

pub mod normalize;

pub use normalize::{canonicalize, html_text_equals, html_visible_text, match_form, normalize_for_match, target_matches};

use crate::error::Result;
use crate::page::{ContentPage, MessageIdPage};
use std::sync::Arc;

/// Visibility check against one host page
#[derive(Clone)]
pub enum VisibilityOracle {
    /// Fingerprints are message ids
    ById(Arc<dyn MessageIdPage>),
    /// Fingerprints are full message texts
    ByContent(Arc<dyn ContentPage>),
}

impl VisibilityOracle {
    /// For each fingerprint, `true` when the node is absent from the page
    pub async fn check_hidden(&self, fingerprints: &[String]) -> Result<Vec<bool>> {
        if fingerprints.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            VisibilityOracle::ById(page) => {
                let present = page.messages_present(fingerprints).await?;
                Ok(hidden_from_presence(&present, fingerprints.len()))
            }
            VisibilityOracle::ByContent(page) => {
                let containers = page.content_containers().await?;
                Ok(hidden_flags(&containers, fingerprints))
            }
        }
    }
}

/// Invert presence flags; missing answers count as absent
fn hidden_from_presence(present: &[bool], expected: usize) -> Vec<bool> {
    (0..expected).map(|i| !present.get(i).copied().unwrap_or(false)).collect()
}

/// A text is hidden unless some rendered container shows exactly it
pub fn hidden_flags(container_htmls: &[String], texts: &[String]) -> Vec<bool> {
    let rendered: Vec<String> =
        container_htmls.iter().map(|html| normalize_for_match(&html_visible_text(html))).collect();
    texts
        .iter()
        .map(|text| {
            let wanted = normalize_for_match(text);
            !rendered.iter().any(|r| *r == wanted)
        })
        .collect()
}

/// Index of the first container whose rendered text equals `text`
pub fn find_container(container_htmls: &[String], text: &str) -> Option<usize> {
    container_htmls.iter().position(|html| html_text_equals(html, text))
}

/// Whether the target's needles show up in any rendered message block
pub async fn target_visible(page: &dyn ContentPage, needles: &[String], min_len: usize) -> Result<bool> {
    if !needles.iter().any(|n| n.trim().chars().count() >= min_len) {
        return Ok(false);
    }
    let texts = page.message_texts().await?;
    Ok(target_matches(&texts, needles, min_len))
}
