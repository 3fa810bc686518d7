use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles after each failure, capped at `max`
    Exponential { max: Duration },
}

/// Bounded retry for operations that may fail transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,

    /// Delay before the first retry
    pub delay: Duration,

    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(3),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Fixed delay between `max_attempts` attempts.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// A single attempt, no retry.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Switch to exponential backoff capped at `max`.
    pub fn exponential(mut self, max: Duration) -> Self {
        self.backoff = Backoff::Exponential { max };
        self
    }

    /// Delay after the `failures`-th failed attempt (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let factor = 1u32
                    .checked_shl(failures.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor).min(max)
            }
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

/// Run `operation` until it succeeds or the policy runs out of attempts.
///
/// The closure receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} succeeded on attempt {}/{}", what, attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt >= attempts => {
                error!("{} failed after {} attempts: {}", what, attempt, e);
                return Err(RetryExhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let wait = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what, attempt, attempts, e, wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
