use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Call `attempt` up to `attempts` times, sleeping `delay` between calls,
/// until it yields `Some`. Errors abort immediately; running out of
/// attempts yields `Ok(None)` so callers can name what was missing.
pub async fn retry<T, F, Fut>(attempts: usize, delay: Duration, mut attempt: F) -> Result<Option<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for n in 0..attempts {
        if let Some(value) = attempt(n).await? {
            return Ok(Some(value));
        }
        if n + 1 < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(None)
}
