use super::retry::retry;
use crate::config::NavigationConfig;
use crate::conversation::Addressing;
use crate::error::{ChatTreeError, Result};
use crate::page::{ClickOutcome, ComposerPage, EditOutcome, MessageLocator};

/// Edits a message in place, which the host turns into a new sibling branch
pub struct Composer<'a> {
    page: &'a dyn ComposerPage,
    addressing: Addressing,
    config: &'a NavigationConfig,
}

impl<'a> Composer<'a> {
    pub fn new(page: &'a dyn ComposerPage, addressing: Addressing, config: &'a NavigationConfig) -> Self {
        Self { page, addressing, config }
    }

    /// Open the editor on `locator`, replace its text and submit
    pub async fn edit(&self, locator: &MessageLocator, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ChatTreeError::MalformedInput("edit text is empty".to_string()));
        }

        let opened = retry(self.config.control_attempts, self.config.control_delay, |_| async move {
            match self.page.click_edit_button(locator).await? {
                EditOutcome::Clicked => Ok(Some(())),
                EditOutcome::MessageMissing => Err(ChatTreeError::not_found("Message", describe(locator))),
                EditOutcome::ControlMissing => Ok(None),
            }
        })
        .await?;
        if opened.is_none() {
            return Err(ChatTreeError::not_found(
                "Edit button",
                format!("{} after {} attempts", describe(locator), self.config.control_attempts),
            ));
        }

        let filled = retry(self.config.textarea_attempts, self.config.textarea_delay, |_| async move {
            Ok(self.page.fill_editor(locator, text).await?.then_some(()))
        })
        .await?;
        if filled.is_none() {
            return Err(ChatTreeError::not_found(
                "Textarea",
                format!("{} after {} attempts", describe(locator), self.config.textarea_attempts),
            ));
        }

        // Only the id-addressed host re-renders in a way worth waiting for
        let settle = match self.addressing {
            Addressing::ById => Some(self.config.mutation_timeout),
            Addressing::ByContent => None,
        };
        match self.page.submit_edit(locator, settle).await? {
            ClickOutcome::Settled => {
                log::info!("Submitted edit for {}", describe(locator));
                Ok(())
            }
            ClickOutcome::Missing => Err(ChatTreeError::not_found("Send button", describe(locator))),
            ClickOutcome::Unchanged => {
                Err(ChatTreeError::Timeout { context: format!("waiting for DOM changes after editing {}", describe(locator)) })
            }
        }
    }

    /// Answer under a message by editing the first of its children that is
    /// rendered
    pub async fn respond(&self, children: &[MessageLocator], text: &str) -> Result<()> {
        if children.is_empty() {
            return Err(ChatTreeError::MalformedInput("message has no children to respond through".to_string()));
        }

        for child in children {
            match self.edit(child, text).await {
                Err(ChatTreeError::NotFound { role, .. }) if role == "Message" => {
                    log::debug!("Child {} not rendered, trying next", describe(child));
                }
                outcome => return outcome,
            }
        }
        Err(ChatTreeError::not_found("Message", "none of the children is rendered"))
    }
}

fn describe(locator: &MessageLocator) -> String {
    match locator {
        MessageLocator::Id(id) => format!("message {}", id),
        MessageLocator::Text(text) => format!("message \"{}\"", text.chars().take(40).collect::<String>()),
    }
}
