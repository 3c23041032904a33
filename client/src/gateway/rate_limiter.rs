//! Token bucket rate limiter
//!
//! # Algorithm
//!
//! The bucket holds up to `burst` tokens and refills continuously at `rate`
//! tokens per second. Each call takes one token; when the bucket is empty the
//! caller sleeps until the next token is due. Refill is computed lazily from
//! the elapsed time on every acquisition, so there is no background task.
//!
//! # Cancellation
//!
//! Waiting is cancellable through a [`CancellationToken`]. A cancelled wait
//! means the process is shutting down, never a transient fault, and is
//! reported as [`LimiterError::Cancelled`].

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Longest single sleep; the bucket is re-checked after it
const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    #[error("Rate limiter wait cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` calls per second with bursts of `burst`.
    /// The bucket starts full.
    pub fn new(name: &'static str, rate: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            name,
            rate: rate.max(f64::MIN_POSITIVE),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for a token
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), LimiterError> {
        loop {
            if cancel.is_cancelled() {
                return Err(LimiterError::Cancelled);
            }

            let wait = match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            tracing::trace!(limiter = self.name, wait_ms = wait.as_millis(), "Rate limited");
            tokio::select! {
                _ = cancel.cancelled() => return Err(LimiterError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Take a token if one is available, otherwise return the time until one is
    fn try_acquire(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            let wait = Duration::try_from_secs_f64(missing / self.rate).unwrap_or(MAX_WAIT);
            Err(wait.min(MAX_WAIT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn test_burst_is_immediate() {
        let limiter = RateLimiter::new("test", 1.0, 5);
        let cancel = CancellationToken::new();

        let started = StdInstant::now();
        for _ in 0..5 {
            limiter.acquire(&cancel).await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_waits_for_refill() {
        let limiter = RateLimiter::new("test", 20.0, 1);
        let cancel = CancellationToken::new();

        let started = StdInstant::now();
        for _ in 0..3 {
            limiter.acquire(&cancel).await.unwrap();
        }
        // Two refills at 20/s take at least ~100ms
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_cancelled_before_wait() {
        let limiter = RateLimiter::new("test", 1.0, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(limiter.acquire(&cancel).await, Err(LimiterError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting() {
        let limiter = RateLimiter::new("test", 0.01, 1);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        assert_eq!(limiter.acquire(&cancel).await, Err(LimiterError::Cancelled));
    }

    #[tokio::test]
    async fn test_tiny_rate_caps_the_wait() {
        let limiter = RateLimiter::new("test", 1e-300, 1);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        assert_eq!(limiter.try_acquire(), Err(MAX_WAIT));

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        assert_eq!(limiter.acquire(&cancel).await, Err(LimiterError::Cancelled));
    }
}
