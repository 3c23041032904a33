//! Async retry with a fixed delay between attempts

use std::time::Duration;

/// Retry an async operation up to `max_attempts` times, sleeping `delay` between attempts.
///
/// Errors for which `is_retryable` returns false are surfaced immediately.
/// Returns the operation's value on success, or `Err((error, attempts))` with
/// the last error once the attempts are exhausted.
pub async fn retry_with_fixed_delay<T, E, F, Fut, P>(
    max_attempts: u32,
    delay: Duration,
    is_retryable: P,
    mut operation: F,
) -> Result<T, (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !is_retryable(&e) {
                    return Err((e, attempts));
                }
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
