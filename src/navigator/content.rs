use super::channel::with_trusted_input;
use super::scoring::{LevelMatcher, ScoredIndicator};
use crate::config::NavigationConfig;
use crate::error::{ChatTreeError, Result};
use crate::oracle::target_visible;
use crate::page::{BranchIndicator, ContentPage, Direction, InputChannel, ScrollPosition};
use crate::planner::NavigationPlan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::time::sleep;

/// Fallback when the page cannot report its scroller height
const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

/// What a successful content navigation run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationReport {
    pub iterations: usize,
    pub clicks: usize,
    /// The target was on screen before anything was clicked
    pub already_visible: bool,
}

/// Drives a content-addressed host to a plan's target with trusted clicks,
/// one click per iteration, scrolling to make virtualized blocks render.
pub struct ContentNavigator<'a> {
    page: &'a dyn ContentPage,
    input: &'a dyn InputChannel,
    config: &'a NavigationConfig,
}

#[derive(Debug, Default)]
struct LevelState {
    satisfied: bool,
    last_error: Option<String>,
}

enum LevelStep {
    Satisfied,
    Clicked,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingLevel<'s> {
    level_index: usize,
    sibling_count: usize,
    target_index: usize,
    last_error: Option<&'s str>,
}

impl<'a> ContentNavigator<'a> {
    pub fn new(page: &'a dyn ContentPage, input: &'a dyn InputChannel, config: &'a NavigationConfig) -> Self {
        Self { page, input, config }
    }

    /// Make the plan's target part of the rendered path.
    ///
    /// The input channel is held for the whole run and released on every
    /// exit path.
    pub async fn navigate(&self, plan: &NavigationPlan) -> Result<NavigationReport> {
        validate(plan)?;
        if plan.is_empty() {
            log::debug!("Plan for {} has no branch decisions", plan.target_id);
            return Ok(NavigationReport::default());
        }

        log::info!("Navigating to {} across {} branch level(s)", plan.target_id, plan.len());
        with_trusted_input(self.input, self.config, || self.run(plan)).await
    }

    async fn run(&self, plan: &NavigationPlan) -> Result<NavigationReport> {
        let matchers: Vec<LevelMatcher<'_>> =
            plan.decisions.iter().map(|d| LevelMatcher::new(d, self.config)).collect();
        let needles = &plan.target_fingerprints;
        let min_len = self.config.min_target_needle_len;

        self.page.scroll_to_top().await?;
        sleep(self.config.initial_scroll_settle).await;

        let height = match self.page.viewport_height().await? {
            h if h > 0.0 => h,
            _ => DEFAULT_VIEWPORT_HEIGHT,
        };
        let dy = (height * self.config.scroll_fraction).floor();

        if target_visible(self.page, needles, min_len).await? {
            log::info!("Target {} already visible", plan.target_id);
            return Ok(NavigationReport { already_visible: true, ..Default::default() });
        }

        let mut levels: Vec<LevelState> = matchers.iter().map(|_| LevelState::default()).collect();
        let mut scroller = Scroller::new(self.config);
        let mut clicks = 0;

        for iteration in 1..=self.config.max_iterations {
            if target_visible(self.page, needles, min_len).await? {
                return Ok(NavigationReport { iterations: iteration, clicks, already_visible: false });
            }

            let mut clicked_level = None;
            for (index, level) in levels.iter_mut().enumerate().filter(|(_, l)| !l.satisfied) {
                match self.step_level(&matchers[index]).await {
                    Ok(LevelStep::Satisfied) => {
                        log::debug!("Level {} already on target", index);
                        level.satisfied = true;
                        level.last_error = None;
                    }
                    Ok(LevelStep::Clicked) => {
                        clicks += 1;
                        clicked_level = Some(index);
                        break;
                    }
                    Err(e @ (ChatTreeError::NotFound { .. } | ChatTreeError::AmbiguousMatch { .. })) => {
                        log::debug!("Level {}: {}", index, e);
                        level.last_error = Some(e.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }

            // A click swaps the subtree below it, so deeper levels are re-read
            if let Some(clicked) = clicked_level {
                levels.iter_mut().skip(clicked + 1).for_each(|l| l.satisfied = false);
            }

            if levels.iter().all(|l| l.satisfied) {
                log::info!("All {} branch level(s) on target", levels.len());
                return Ok(NavigationReport { iterations: iteration, clicks, already_visible: false });
            }
            if clicked_level.is_some() && target_visible(self.page, needles, min_len).await? {
                return Ok(NavigationReport { iterations: iteration, clicks, already_visible: false });
            }

            if clicked_level.is_none() {
                if self.config.diagnostics_every > 0 && iteration % self.config.diagnostics_every == 0 {
                    let totals = self.available_totals().await;
                    log::debug!("Iteration {}: available branch totals {:?}", iteration, totals);
                }
                let position = self.page.scroll_by(dy * scroller.direction()).await?;
                scroller.record(position);
                sleep(self.config.scroll_settle).await;
            }
        }

        let available_totals = self.available_totals().await;
        Err(ChatTreeError::NavigationExhausted {
            iterations: self.config.max_iterations,
            pending: pending_summary(&matchers, &levels),
            available_totals,
        })
    }

    /// Probe one level and click at most once
    async fn step_level(&self, matcher: &LevelMatcher<'_>) -> Result<LevelStep> {
        let indicators = self.page.branch_indicators().await?;
        let ScoredIndicator { indicator, score } = matcher.select(&indicators)?;
        log::trace!("Level candidate #{} scored {} ({}/{})", indicator.dom_index, score, indicator.current, indicator.total);

        let target = matcher.target_index();
        if indicator.current_index() == target {
            return Ok(LevelStep::Satisfied);
        }

        // Coordinates go stale as soon as anything scrolls
        let mut fresh = self.reveal(&indicator).await?;
        if fresh.current_index() == target {
            return Ok(LevelStep::Satisfied);
        }

        let mut direction = Direction::toward(fresh.current_index(), target);
        if fresh.button(direction).is_none() {
            self.input.hover(fresh.hover_point).await?;
            sleep(self.config.hover_settle).await;
            fresh = self.reveal(&fresh).await?;
            direction = Direction::toward(fresh.current_index(), target);
        }

        let point = fresh
            .button(direction)
            .ok_or_else(|| ChatTreeError::not_found("Branch buttons", "not found under candidate wrapper"))?;

        self.input.hover(fresh.hover_point).await?;
        sleep(self.config.pre_click_hover).await;
        self.input.click(point).await?;
        log::debug!("Clicked {} on indicator #{} ({}/{})", direction.as_str(), fresh.dom_index, fresh.current, fresh.total);
        sleep(self.config.click_settle).await;

        Ok(LevelStep::Clicked)
    }

    async fn reveal(&self, indicator: &BranchIndicator) -> Result<BranchIndicator> {
        Ok(self.page.reveal_indicator(indicator.dom_index).await?.unwrap_or_else(|| indicator.clone()))
    }

    /// Distinct sibling totals rendered anywhere on the page
    async fn available_totals(&self) -> Vec<u32> {
        match self.page.branch_indicators().await {
            Ok(indicators) => {
                let totals: BTreeSet<u32> = indicators.iter().map(|i| i.total as u32).collect();
                totals.into_iter().collect()
            }
            Err(e) => {
                log::warn!("Failed to read branch totals: {}", e);
                Vec::new()
            }
        }
    }
}

fn validate(plan: &NavigationPlan) -> Result<()> {
    if plan.target_id.is_empty() {
        return Err(ChatTreeError::MalformedInput("plan has no target".to_string()));
    }
    for (index, decision) in plan.decisions.iter().enumerate() {
        if decision.sibling_count < 2 || decision.target_index >= decision.sibling_count {
            return Err(ChatTreeError::MalformedInput(format!(
                "decision {} selects index {} of {} siblings",
                index, decision.target_index, decision.sibling_count
            )));
        }
    }
    Ok(())
}

fn pending_summary(matchers: &[LevelMatcher<'_>], levels: &[LevelState]) -> String {
    let pending: Vec<PendingLevel<'_>> = matchers
        .iter()
        .zip(levels)
        .enumerate()
        .filter(|(_, (_, state))| !state.satisfied)
        .map(|(index, (matcher, state))| PendingLevel {
            level_index: index,
            sibling_count: matcher.decision().sibling_count,
            target_index: matcher.decision().target_index,
            last_error: state.last_error.as_deref(),
        })
        .collect();

    let json = serde_json::to_string(&pending).unwrap_or_else(|_| "[]".to_string());
    format!("Pending levels: {}", json)
}

/// Scroll direction bookkeeping. Starts upward, turns around at either end
/// of the range and after too many scrolls that did not move.
#[derive(Debug, Clone)]
pub(crate) struct Scroller {
    direction: f64,
    last_top: Option<f64>,
    stuck: usize,
    epsilon: f64,
    threshold: usize,
}

impl Scroller {
    pub(crate) fn new(config: &NavigationConfig) -> Self {
        Self {
            direction: -1.0,
            last_top: None,
            stuck: 0,
            epsilon: config.stuck_epsilon_px,
            threshold: config.stuck_threshold,
        }
    }

    pub(crate) fn direction(&self) -> f64 {
        self.direction
    }

    pub(crate) fn record(&mut self, position: Option<ScrollPosition>) {
        match position {
            Some(pos) => {
                let moved = self.last_top.map(|top| (pos.scroll_top - top).abs()).unwrap_or(f64::INFINITY);
                if moved < self.epsilon {
                    self.stuck += 1;
                } else {
                    self.stuck = 0;
                }
                self.last_top = Some(pos.scroll_top);

                if pos.scroll_top >= pos.max_scroll_top - 1.0 && pos.max_scroll_top > 1.0 {
                    self.direction = -1.0;
                } else if pos.scroll_top <= 1.0 {
                    self.direction = 1.0;
                }
            }
            None => self.stuck += 1,
        }

        if self.stuck > self.threshold {
            self.stuck = 0;
            self.direction = -self.direction;
        }
    }
}
