use crate::config::NavigationConfig;
use crate::error::{ChatTreeError, Result};
use crate::oracle::match_form;
use crate::page::BranchIndicator;
use crate::planner::NavigationDecision;

/// A branch control together with how well it fits one decision
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIndicator {
    pub indicator: BranchIndicator,
    pub score: i32,
}

/// Picks the rendered branch control that governs one plan level.
///
/// The parent's excerpt is looked for in the block right above the control
/// (the parent is rendered there), sibling excerpts in the block carrying
/// the control, and a matching total adds a bonus.
#[derive(Debug, Clone)]
pub struct LevelMatcher<'a> {
    decision: &'a NavigationDecision,
    config: &'a NavigationConfig,
    anchor_head: Option<String>,
    anchor_mid: Option<String>,
    sibling_needles: Vec<String>,
}

impl<'a> LevelMatcher<'a> {
    pub fn new(decision: &'a NavigationDecision, config: &'a NavigationConfig) -> Self {
        let anchor = decision.ancestor_fingerprint.as_deref().map(match_form).filter(|a| !a.is_empty());

        let anchor_head = anchor.as_deref().map(|a| take_chars(a, 0, config.needle_len));
        let anchor_mid = anchor.as_deref().and_then(|a| {
            let len = a.chars().count();
            let start = (len / 2).saturating_sub(config.needle_len / 2);
            let mid = take_chars(a, start, config.needle_len);
            (mid.chars().count() > config.anchor_mid_min_len).then_some(mid)
        });

        let sibling_needles = decision
            .sibling_fingerprints
            .iter()
            .map(|s| match_form(s))
            .filter(|s| s.chars().count() >= config.sibling_min_len)
            .collect();

        Self { decision, config, anchor_head, anchor_mid, sibling_needles }
    }

    pub fn decision(&self) -> &NavigationDecision {
        self.decision
    }

    pub fn target_index(&self) -> usize {
        self.decision.target_index
    }

    pub fn score(&self, indicator: &BranchIndicator) -> i32 {
        let mut score = 0;

        if self.anchor_head.is_some() || self.anchor_mid.is_some() {
            let preceding = match_form(&indicator.preceding_text);
            if self.anchor_head.as_deref().is_some_and(|head| preceding.contains(head)) {
                score += self.config.anchor_head_weight;
            }
            if self.anchor_mid.as_deref().is_some_and(|mid| preceding.contains(mid)) {
                score += self.config.anchor_mid_weight;
            }
        }

        let wrapper = match_form(&indicator.wrapper_text);
        for needle in &self.sibling_needles {
            if wrapper.contains(needle.as_str()) {
                score += self.config.sibling_weight;
            }
        }

        if indicator.total == self.decision.sibling_count {
            score += self.config.total_match_weight;
        }

        score
    }

    /// All indicators scored, best first. Ties go to the lower block.
    pub fn rank(&self, indicators: &[BranchIndicator]) -> Vec<ScoredIndicator> {
        let mut ranked: Vec<ScoredIndicator> = indicators
            .iter()
            .map(|indicator| ScoredIndicator { score: self.score(indicator), indicator: indicator.clone() })
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(b.indicator.top.total_cmp(&a.indicator.top)));
        ranked
    }

    /// The best candidate, if it clears the acceptance threshold
    pub fn select(&self, indicators: &[BranchIndicator]) -> Result<ScoredIndicator> {
        let mut ranked = self.rank(indicators);
        if ranked.is_empty() {
            return Err(ChatTreeError::not_found(
                "Branch control",
                format!("No branch control found for expected sibling count {}", self.decision.sibling_count),
            ));
        }

        let candidates = ranked.len();
        let best = ranked.swap_remove(0);
        if best.score < self.config.min_candidate_score {
            return Err(ChatTreeError::AmbiguousMatch { best_score: best.score, candidates });
        }
        Ok(best)
    }
}

fn take_chars(text: &str, start: usize, len: usize) -> String {
    text.chars().skip(start).take(len).collect()
}
