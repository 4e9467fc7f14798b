use super::retry::retry;
use crate::config::NavigationConfig;
use crate::error::{ChatTreeError, Result};
use crate::page::{ClickOutcome, Direction, MessageIdPage};
use crate::planner::NavigationStep;

/// Executes per-level click counts on hosts that tag messages with ids.
///
/// Controls sit at fixed positions next to each message, so no matching is
/// needed. Every click must be confirmed by a DOM mutation before the next.
pub struct IdentifierNavigator<'a> {
    page: &'a dyn MessageIdPage,
    config: &'a NavigationConfig,
}

impl<'a> IdentifierNavigator<'a> {
    pub fn new(page: &'a dyn MessageIdPage, config: &'a NavigationConfig) -> Self {
        Self { page, config }
    }

    /// Run all steps in order. Returns the number of clicks made.
    pub async fn execute(&self, steps: &[NavigationStep]) -> Result<usize> {
        validate(steps)?;
        let mut clicks = 0;
        for (level, step) in steps.iter().enumerate() {
            clicks += self.execute_step(level, step).await?;
        }
        Ok(clicks)
    }

    async fn execute_step(&self, level: usize, step: &NavigationStep) -> Result<usize> {
        let (direction, count) =
            if step.steps_left > 0 { (Direction::Previous, step.steps_left) } else { (Direction::Next, step.steps_right) };
        log::debug!("Level {}: {} x{} from {}", level, direction.as_str(), count, step.node_id);

        // The rendered sibling changes after every click
        let mut node_id = step.node_id.clone();
        let mut index = step.current_index();

        for _ in 0..count {
            let outcome = retry(self.config.control_attempts, self.config.control_delay, |_| {
                let node_id = node_id.as_str();
                async move {
                    self.page.prime_controls(node_id).await?;
                    let outcome = self
                        .page
                        .click_branch_button(node_id, step.role, direction, self.config.mutation_timeout)
                        .await?;
                    Ok(match outcome {
                        ClickOutcome::Missing => None,
                        other => Some(other),
                    })
                }
            })
            .await?;

            match outcome {
                Some(ClickOutcome::Settled) => {}
                Some(ClickOutcome::Unchanged) => {
                    return Err(level_failed(&node_id, level, "Timeout waiting for DOM changes"));
                }
                _ => {
                    return Err(level_failed(
                        &node_id,
                        level,
                        format!("Navigation button not found after {} attempts", self.config.control_attempts),
                    ));
                }
            }

            index = index.map(|i| match direction {
                Direction::Previous => i.saturating_sub(1),
                Direction::Next => i + 1,
            });
            if let Some(next) = index.and_then(|i| step.siblings.get(i)) {
                node_id = next.clone();
            }
        }

        Ok(count)
    }
}

fn level_failed(node_id: &str, level: usize, reason: impl Into<String>) -> ChatTreeError {
    ChatTreeError::LevelFailed { node_id: node_id.to_string(), level, reason: reason.into() }
}

fn validate(steps: &[NavigationStep]) -> Result<()> {
    for (level, step) in steps.iter().enumerate() {
        if step.node_id.is_empty() {
            return Err(ChatTreeError::MalformedInput(format!("step {} has no node id", level)));
        }
        if step.steps_left > 0 && step.steps_right > 0 {
            return Err(ChatTreeError::MalformedInput(format!("step {} moves both left and right", level)));
        }
    }
    Ok(())
}
