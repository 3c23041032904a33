//! Rate-limited, timeout-bounded, retrying remote calls
//!
//! Every remote call of a run goes through a [`RateLimitedGateway`]: wait for a
//! token, run the attempt under a fresh timeout, retry failed attempts with a
//! fixed delay. The read side (cloud API) and the write side (collector) each
//! own a gateway with an independent limiter.
//!
//! A cancelled limiter wait is never retried; it means the whole run is being
//! torn down.

pub mod rate_limiter;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use rate_limiter::{LimiterError, RateLimiter};

use crate::core::constants::{RETRY_ATTEMPTS, RETRY_DELAY_MS};
use crate::utils::retry::retry_with_fixed_delay;

#[derive(Error, Debug)]
pub enum GatewayError<E> {
    #[error("Rate limiter wait cancelled")]
    Cancelled,

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Call(E),
}

impl<E> GatewayError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitedGateway {
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
    timeout: Duration,
    max_attempts: u32,
    retry_delay: Duration,
}

impl RateLimitedGateway {
    pub fn new(limiter: Arc<RateLimiter>, cancel: CancellationToken, timeout: Duration) -> Self {
        Self {
            limiter,
            cancel,
            timeout,
            max_attempts: RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Run `operation` under the limiter, timeout and retry policy.
    ///
    /// `operation` is invoked once per attempt and must produce a fresh future.
    pub async fn call<T, E, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, GatewayError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let limiter = &self.limiter;
        let cancel = &self.cancel;
        let timeout = self.timeout;

        let result = retry_with_fixed_delay(
            self.max_attempts,
            self.retry_delay,
            |e: &GatewayError<E>| !e.is_cancelled(),
            || {
                let call = attempt();
                async move {
                    if limiter.acquire(cancel).await.is_err() {
                        return Err(GatewayError::Cancelled);
                    }
                    match tokio::time::timeout(timeout, call).await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(e)) => Err(GatewayError::Call(e)),
                        Err(_) => Err(GatewayError::Timeout(timeout)),
                    }
                }
            },
        )
        .await;

        result.map_err(|(e, attempts)| {
            tracing::debug!(
                operation,
                limiter = limiter.name(),
                attempts,
                error = %e,
                "Remote call failed"
            );
            e
        })
    }
}
