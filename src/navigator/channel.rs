use crate::config::NavigationConfig;
use crate::error::{ChatTreeError, Result};
use crate::page::InputChannel;
use std::future::Future;

/// Run `body` while holding the trusted-input channel.
///
/// A channel held by another run is never released from here: attachment
/// is retried on contention with a short backoff and fails once the budget
/// is spent. The channel is detached on every exit path. A detach that
/// fails for any reason other than "not attached" is retried once.
pub async fn with_trusted_input<T, F, Fut>(channel: &dyn InputChannel, config: &NavigationConfig, body: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    attach(channel, config).await?;

    let outcome = body().await;

    if !safe_detach(channel, "finally").await {
        tokio::time::sleep(config.detach_retry).await;
        safe_detach(channel, "finally-retry").await;
    }

    outcome
}

async fn attach(channel: &dyn InputChannel, config: &NavigationConfig) -> Result<()> {
    let attempts = config.attach_attempts.max(1);
    for attempt in 0..attempts {
        match channel.attach().await {
            Ok(()) => {
                log::debug!("Input channel attached");
                return Ok(());
            }
            Err(ChatTreeError::ChannelContention(reason)) if attempt + 1 < attempts => {
                log::debug!("Input channel busy ({}), retrying", reason);
                tokio::time::sleep(config.attach_backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(ChatTreeError::ChannelContention("attach attempts exhausted".to_string()))
}

/// `false` only when the detach failed and the channel may still be held
async fn safe_detach(channel: &dyn InputChannel, context: &str) -> bool {
    match channel.detach().await {
        Ok(()) => true,
        Err(e) if e.is_not_attached() => true,
        Err(e) => {
            log::warn!("Unexpected detach error ({}): {}", context, e);
            false
        }
    }
}
