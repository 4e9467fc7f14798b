use super::{
    BranchIndicator, ClickOutcome, ComposerPage, ContentPage, Direction, EditOutcome, InputChannel, MessageIdPage,
    MessageLocator, Point, ScrollPosition,
};
use crate::error::{ChatTreeError, Result};
use crate::tree::Role;
use async_trait::async_trait;
use headless_chrome::Tab;
use headless_chrome::browser::tab::point::Point as CdpPoint;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const MESSAGE_TEXTS_JS: &str = include_str!("js/message_texts.js");
const INDICATORS_JS: &str = include_str!("js/indicators.js");
const CONTAINERS_JS: &str = include_str!("js/containers.js");
const SCROLLER_JS: &str = include_str!("js/scroller.js");
const MESSAGES_PRESENT_JS: &str = include_str!("js/messages_present.js");
const PRIME_JS: &str = include_str!("js/prime.js");
const BRANCH_BUTTON_JS: &str = include_str!("js/branch_button.js");
const REVEAL_MESSAGE_JS: &str = include_str!("js/reveal_message.js");
const COMPOSER_JS: &str = include_str!("js/composer.js");

/// A chat tab driven over CDP.
///
/// Each probe is a JS function shipped with the crate; it is called with a
/// JSON argument and answers with a JSON string.
#[derive(Clone)]
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Current URL of the tab
    pub fn url(&self) -> String {
        self.tab.get_url()
    }

    async fn run<T: DeserializeOwned>(&self, script: &'static str, args: Value) -> Result<T> {
        let tab = Arc::clone(&self.tab);
        let expression = format!("({})({})", script.trim(), args);

        let remote = tokio::task::spawn_blocking(move || tab.evaluate(&expression, true))
            .await
            .map_err(|e| ChatTreeError::EvaluationFailed(format!("Probe task failed: {}", e)))?
            .map_err(|e| ChatTreeError::EvaluationFailed(e.to_string()))?;

        let value = remote
            .value
            .ok_or_else(|| ChatTreeError::ScriptResultInvalid("No value returned from page probe".to_string()))?;

        // Probes answer with a JSON string so nested objects survive the round trip
        let json_str: String = serde_json::from_value(value)
            .map_err(|e| ChatTreeError::ScriptResultInvalid(format!("Expected a JSON string: {}", e)))?;

        serde_json::from_str(&json_str)
            .map_err(|e| ChatTreeError::ScriptResultInvalid(format!("Failed to parse probe result: {}", e)))
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[async_trait]
impl ContentPage for ChromePage {
    async fn message_texts(&self) -> Result<Vec<String>> {
        self.run(MESSAGE_TEXTS_JS, json!({})).await
    }

    async fn branch_indicators(&self) -> Result<Vec<BranchIndicator>> {
        self.run(INDICATORS_JS, json!({ "reveal": null })).await
    }

    async fn reveal_indicator(&self, dom_index: usize) -> Result<Option<BranchIndicator>> {
        self.run(INDICATORS_JS, json!({ "reveal": dom_index })).await
    }

    async fn content_containers(&self) -> Result<Vec<String>> {
        self.run(CONTAINERS_JS, json!({ "reveal": null })).await
    }

    async fn reveal_container(&self, index: usize) -> Result<bool> {
        self.run(CONTAINERS_JS, json!({ "reveal": index })).await
    }

    async fn viewport_height(&self) -> Result<f64> {
        self.run(SCROLLER_JS, json!({ "op": "height" })).await
    }

    async fn scroll_to_top(&self) -> Result<()> {
        let _: Option<Value> = self.run(SCROLLER_JS, json!({ "op": "top" })).await?;
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<Option<ScrollPosition>> {
        self.run(SCROLLER_JS, json!({ "op": "by", "dy": dy })).await
    }
}

#[async_trait]
impl MessageIdPage for ChromePage {
    async fn messages_present(&self, ids: &[String]) -> Result<Vec<bool>> {
        self.run(MESSAGES_PRESENT_JS, json!({ "ids": ids })).await
    }

    async fn prime_controls(&self, node_id: &str) -> Result<()> {
        let _: bool = self.run(PRIME_JS, json!({ "nodeId": node_id })).await?;
        Ok(())
    }

    async fn prime_all(&self) -> Result<()> {
        let primed: bool = self.run(PRIME_JS, json!({ "nodeId": null })).await?;
        log::debug!("Primed conversation turns: {}", primed);
        Ok(())
    }

    async fn click_branch_button(
        &self,
        node_id: &str,
        role: Role,
        direction: Direction,
        settle: Duration,
    ) -> Result<ClickOutcome> {
        self.run(
            BRANCH_BUTTON_JS,
            json!({
                "nodeId": node_id,
                "role": role.as_str(),
                "direction": direction.as_str(),
                "settleMs": millis(settle),
            }),
        )
        .await
    }

    async fn reveal_message(&self, node_id: &str) -> Result<bool> {
        self.run(REVEAL_MESSAGE_JS, json!({ "nodeId": node_id })).await
    }
}

#[async_trait]
impl ComposerPage for ChromePage {
    async fn click_edit_button(&self, locator: &MessageLocator) -> Result<EditOutcome> {
        self.run(COMPOSER_JS, json!({ "op": "edit", "locator": locator })).await
    }

    async fn fill_editor(&self, locator: &MessageLocator, text: &str) -> Result<bool> {
        self.run(COMPOSER_JS, json!({ "op": "fill", "locator": locator, "text": text })).await
    }

    async fn submit_edit(&self, locator: &MessageLocator, settle: Option<Duration>) -> Result<ClickOutcome> {
        self.run(
            COMPOSER_JS,
            json!({ "op": "submit", "locator": locator, "settleMs": settle.map(millis) }),
        )
        .await
    }
}

/// Trusted mouse input through CDP `Input.dispatchMouseEvent`.
///
/// CDP itself allows any number of clients, so exclusivity is tracked here:
/// a second `attach` fails with contention until the holder detaches.
pub struct ChromeInputChannel {
    tab: Arc<Tab>,
    attached: AtomicBool,
}

impl ChromeInputChannel {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab, attached: AtomicBool::new(false) }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.is_attached() { Ok(()) } else { Err(ChatTreeError::ChannelNotAttached) }
    }

    async fn dispatch<F>(&self, what: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&Tab) -> anyhow::Result<()> + Send + 'static,
    {
        self.ensure_attached()?;
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| ChatTreeError::ChannelFailed(format!("{} task failed: {}", what, e)))?
            .map_err(|e| ChatTreeError::ChannelFailed(format!("{} failed: {}", what, e)))
    }
}

/// Holds the attach flag while an attach is in progress. Dropping the claim
/// without [`AttachClaim::keep`] releases the flag, so a failed, panicked or
/// cancelled attach never leaves the channel looking held.
struct AttachClaim<'a> {
    flag: &'a AtomicBool,
    kept: bool,
}

impl<'a> AttachClaim<'a> {
    fn take(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ChatTreeError::ChannelContention("Another debugger is already attached".to_string()))?;
        Ok(Self { flag, kept: false })
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for AttachClaim<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl InputChannel for ChromeInputChannel {
    async fn attach(&self) -> Result<()> {
        let claim = AttachClaim::take(&self.attached)?;

        // Trusted input lands on whatever tab is in front
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || tab.activate().map(|_| ()))
            .await
            .map_err(|e| ChatTreeError::ChannelFailed(format!("Activate task failed: {}", e)))?
            .map_err(|e| ChatTreeError::ChannelFailed(format!("Failed to activate tab: {}", e)))?;

        claim.keep();
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        if self.attached.swap(false, Ordering::SeqCst) { Ok(()) } else { Err(ChatTreeError::ChannelNotAttached) }
    }

    async fn hover(&self, point: Point) -> Result<()> {
        self.dispatch("Hover", move |tab| {
            tab.move_mouse_to_point(CdpPoint { x: point.x, y: point.y })?;
            Ok(())
        })
        .await
    }

    async fn click(&self, point: Point) -> Result<()> {
        self.dispatch("Click", move |tab| {
            tab.click_point(CdpPoint { x: point.x, y: point.y })?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_claim_released_unless_kept() {
        let flag = AtomicBool::new(false);

        let claim = AttachClaim::take(&flag).unwrap();
        assert!(flag.load(Ordering::SeqCst));
        assert!(matches!(AttachClaim::take(&flag), Err(ChatTreeError::ChannelContention(_))));
        drop(claim);
        assert!(!flag.load(Ordering::SeqCst));

        AttachClaim::take(&flag).unwrap().keep();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_attach_claim_released_on_early_return() {
        fn attach_with(flag: &AtomicBool, activated: Result<()>) -> Result<()> {
            let claim = AttachClaim::take(flag)?;
            activated?;
            claim.keep();
            Ok(())
        }

        let flag = AtomicBool::new(false);
        let panicked = Err(ChatTreeError::ChannelFailed("Activate task failed: task panicked".into()));
        assert!(attach_with(&flag, panicked).is_err());
        assert!(!flag.load(Ordering::SeqCst));

        attach_with(&flag, Ok(())).unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }
}
