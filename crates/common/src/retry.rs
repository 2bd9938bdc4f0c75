//! Bounded retry policy
//!
//! A fixed number of attempts separated by a fixed pause. The policy is a
//! `backoff::backoff::Backoff` schedule and is driven by
//! `backoff::future::retry_notify`, so waits go through the tokio timer and
//! never block a worker thread.

use backoff::backoff::Backoff;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;

/// Retry policy: `max_attempts` tries, `delay` between consecutive tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,

    /// Pause between a failed attempt and the next one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

/// Outcome of a failed retry loop
#[derive(Debug)]
pub struct RetryError<E> {
    /// Attempts actually made
    pub attempts: u32,

    /// Error returned by the final attempt
    pub last_error: E,
}

/// Schedule state for one retry loop
struct FixedAttempts {
    remaining: u32,
    max_attempts: u32,
    delay: Duration,
}

impl Backoff for FixedAttempts {
    fn reset(&mut self) {
        self.remaining = self.max_attempts.saturating_sub(1);
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempts and fixed delay
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn schedule(&self) -> FixedAttempts {
        let mut schedule = FixedAttempts {
            remaining: 0,
            max_attempts: self.max_attempts.max(1),
            delay: self.delay,
        };
        schedule.reset();
        schedule
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// Every failure is logged with its attempt number. After the final
    /// attempt the last error is returned unchanged inside `RetryError`.
    pub async fn run<T, E, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = AtomicU32::new(0);
        let max_attempts = self.max_attempts.max(1);

        let result = backoff::future::retry_notify(
            self.schedule(),
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let fut = operation();
                async move {
                    fut.await.map_err(|e| {
                        warn!(
                            operation = operation_name,
                            attempt,
                            max_attempts,
                            error = %e,
                            "Attempt {} failed", attempt
                        );
                        metrics::counter!(crate::metrics::RETRY_FAILURES, "operation" => operation_name.to_string())
                            .increment(1);
                        backoff::Error::transient(e)
                    })
                }
            },
            |_err: E, wait: Duration| {
                tracing::debug!(operation = operation_name, wait_ms = wait.as_millis() as u64, "Retrying");
            },
        )
        .await;

        result.map_err(|last_error| RetryError {
            attempts: attempts.load(Ordering::SeqCst),
            last_error,
        })
    }
}
