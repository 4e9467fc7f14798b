//! Navigation tuning
//!
//! The fuzzy-matching weights and polling budgets below were tuned against the
//! host pages' current markup. They are heuristics, so they live here as
//! configuration rather than as constants scattered through the navigator.

use crate::error::{ChatTreeError, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Tuning knobs for tree building, planning, matching and navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Cap on content-navigator iterations
    pub max_iterations: usize,

    /// Fraction of the scroller's visible height moved per scroll step
    pub scroll_fraction: f64,

    /// Consecutive non-moving scrolls before the direction flips
    pub stuck_threshold: usize,

    /// Scroll movement (px) below which a scroll counts as stuck
    pub stuck_epsilon_px: f64,

    /// Target needles shorter than this are ignored by the termination check
    pub min_target_needle_len: usize,

    /// Maximum number of target needles carried by a plan
    pub max_target_needles: usize,

    /// Length of each fingerprint excerpt
    pub needle_len: usize,

    /// Texts longer than this also get middle and suffix excerpts
    pub long_text_threshold: usize,

    /// Length of the parent anchor excerpt
    pub anchor_len: usize,

    /// Maximum number of sibling fingerprints per decision
    pub max_sibling_needles: usize,

    pub anchor_head_weight: i32,
    pub anchor_mid_weight: i32,
    pub anchor_mid_min_len: usize,
    pub sibling_weight: i32,
    pub sibling_min_len: usize,
    pub total_match_weight: i32,

    /// Candidates scoring below this are treated as not found
    pub min_candidate_score: i32,

    /// Maximum label/preview length before ellipsis truncation
    pub label_len: usize,

    #[serde(with = "millis")]
    pub click_settle: Duration,
    #[serde(with = "millis")]
    pub hover_settle: Duration,
    #[serde(with = "millis")]
    pub pre_click_hover: Duration,
    #[serde(with = "millis")]
    pub scroll_settle: Duration,
    #[serde(with = "millis")]
    pub initial_scroll_settle: Duration,
    #[serde(with = "millis")]
    pub mutation_timeout: Duration,

    /// Attempts to locate a navigation or edit control
    pub control_attempts: usize,
    #[serde(with = "millis")]
    pub control_delay: Duration,

    /// Attempts to find the editor textarea
    pub textarea_attempts: usize,
    #[serde(with = "millis")]
    pub textarea_delay: Duration,

    /// Attempts to attach the trusted-input channel on contention
    pub attach_attempts: usize,
    #[serde(with = "millis")]
    pub attach_backoff: Duration,
    #[serde(with = "millis")]
    pub detach_retry: Duration,

    /// Log available branch totals every N idle iterations
    pub diagnostics_every: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 120,
            scroll_fraction: 0.8,
            stuck_threshold: 8,
            stuck_epsilon_px: 2.0,
            min_target_needle_len: 10,
            max_target_needles: 3,
            needle_len: 80,
            long_text_threshold: 240,
            anchor_len: 400,
            max_sibling_needles: 10,
            anchor_head_weight: 5,
            anchor_mid_weight: 3,
            anchor_mid_min_len: 20,
            sibling_weight: 1,
            sibling_min_len: 5,
            total_match_weight: 2,
            min_candidate_score: 2,
            label_len: 100,
            click_settle: Duration::from_millis(200),
            hover_settle: Duration::from_millis(120),
            pre_click_hover: Duration::from_millis(100),
            scroll_settle: Duration::from_millis(220),
            initial_scroll_settle: Duration::from_millis(200),
            mutation_timeout: Duration::from_secs(2),
            control_attempts: 50,
            control_delay: Duration::from_millis(100),
            textarea_attempts: 10,
            textarea_delay: Duration::from_millis(100),
            attach_attempts: 3,
            attach_backoff: Duration::from_millis(200),
            detach_retry: Duration::from_millis(50),
            diagnostics_every: 10,
        }
    }
}

impl NavigationConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a JSON file; missing fields fall back to defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChatTreeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ChatTreeError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make navigation loop forever or never act
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ChatTreeError::Config("max_iterations must be positive".to_string()));
        }
        if !(self.scroll_fraction > 0.0 && self.scroll_fraction <= 1.0) {
            return Err(ChatTreeError::Config(format!(
                "scroll_fraction must be in (0, 1], got {}",
                self.scroll_fraction
            )));
        }
        if self.needle_len == 0 {
            return Err(ChatTreeError::Config("needle_len must be positive".to_string()));
        }
        if self.attach_attempts == 0 || self.control_attempts == 0 || self.textarea_attempts == 0 {
            return Err(ChatTreeError::Config("attempt counts must be positive".to_string()));
        }
        Ok(())
    }

    /// Builder method: set the iteration cap
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder method: set the acceptance threshold for branch controls
    pub fn min_candidate_score(mut self, score: i32) -> Self {
        self.min_candidate_score = score;
        self
    }

    /// Builder method: set the DOM mutation wait
    pub fn mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout = timeout;
        self
    }

    /// Builder method: set control lookup attempts and delay
    pub fn control_retry(mut self, attempts: usize, delay: Duration) -> Self {
        self.control_attempts = attempts;
        self.control_delay = delay;
        self
    }

    /// Builder method: set attach attempts and backoff for a busy input channel
    pub fn attach_retry(mut self, attempts: usize, backoff: Duration) -> Self {
        self.attach_attempts = attempts;
        self.attach_backoff = backoff;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
