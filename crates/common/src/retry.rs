//! Retry utilities.
//!
//! This module provides utilities for retrying operations with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Policy for retrying a failed operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first try (0 means no retries)
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 for doubling)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3)
    }
}

impl RetryPolicy {
    /// Set the maximum delay between retries.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self::linear(0, Duration::ZERO)
    }

    /// Create a policy with exponential backoff starting at 100ms.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    /// Create a policy that waits the same `delay` before every retry.
    pub fn linear(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }
}

/// Exponential backoff calculator.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff calculator.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            current_attempt: 0,
        }
    }

    /// Calculate the delay for the current attempt.
    pub fn delay(&self) -> Duration {
        if self.current_attempt == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.policy.initial_delay.as_millis() as f64
            * self
                .policy
                .backoff_multiplier
                .powi((self.current_attempt - 1) as i32);

        Duration::from_millis(delay_ms as u64).min(self.policy.max_delay)
    }

    /// Move to the next attempt.
    pub fn next_attempt(&mut self) {
        self.current_attempt += 1;
    }

    /// Number of retries taken so far.
    pub fn attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Check if there are more attempts remaining.
    pub fn has_attempts_remaining(&self) -> bool {
        self.current_attempt <= self.policy.max_retries
    }
}

/// Retry an async operation with exponential backoff.
///
/// # Examples
///
/// ```no_run
/// use tourney_common::retry::{retry_with_backoff, RetryPolicy};
///
/// #[tokio::main]
/// async fn main() {
///     let result = retry_with_backoff(RetryPolicy::exponential(3), || async {
///         Ok::<_, std::io::Error>(())
///     }).await;
/// }
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(policy: RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with_predicate(policy, operation, |_| true).await
}

/// Retry an async operation while `should_retry` accepts the error.
///
/// Errors rejected by the predicate are returned immediately without waiting.
///
/// # Examples
///
/// ```no_run
/// use tourney_common::retry::{retry_with_predicate, RetryPolicy};
///
/// #[tokio::main]
/// async fn main() {
///     let result = retry_with_predicate(
///         RetryPolicy::exponential(3),
///         || async {
///             Err::<(), _>(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"))
///         },
///         |err| err.kind() == std::io::ErrorKind::TimedOut
///     ).await;
/// }
/// ```
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: RetryPolicy,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut backoff = ExponentialBackoff::new(policy);

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !should_retry(&error) {
                    return Err(error);
                }

                backoff.next_attempt();

                if !backoff.has_attempts_remaining() {
                    return Err(error);
                }

                let delay = backoff.delay();
                tracing::debug!(
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying operation after retryable error"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_linear_policy() {
        let policy = RetryPolicy::linear(2, Duration::from_millis(200));
        let mut backoff = ExponentialBackoff::new(policy);

        backoff.next_attempt();
        assert_eq!(backoff.delay(), Duration::from_millis(200));
        backoff.next_attempt();
        assert_eq!(backoff.delay(), Duration::from_millis(200));
        assert!(backoff.has_attempts_remaining());
        backoff.next_attempt();
        assert!(!backoff.has_attempts_remaining());
    }

    #[test]
    fn test_exponential_backoff() {
        let mut backoff = ExponentialBackoff::new(RetryPolicy::exponential(3));

        assert_eq!(backoff.delay(), Duration::ZERO);

        backoff.next_attempt();
        assert_eq!(backoff.delay(), Duration::from_millis(100));

        backoff.next_attempt();
        assert_eq!(backoff.delay(), Duration::from_millis(200));

        backoff.next_attempt();
        assert_eq!(backoff.delay(), Duration::from_millis(400));
        assert!(backoff.has_attempts_remaining());

        backoff.next_attempt();
        assert!(!backoff.has_attempts_remaining());
    }

    #[test]
    fn test_exponential_backoff_max_delay() {
        let policy = RetryPolicy::exponential(10).with_max_delay(Duration::from_millis(500));
        let mut backoff = ExponentialBackoff::new(policy);

        for _ in 0..10 {
            backoff.next_attempt();
        }

        assert_eq!(backoff.delay(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_backoff_eventual_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(RetryPolicy::exponential(3), || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "error"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_backoff(RetryPolicy::linear(2, Duration::from_millis(200)), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(std::io::Error::new(std::io::ErrorKind::Other, "error"))
            }
        })
        .await;

        assert!(result.is_err());
        // Initial + 2 retries
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_with_predicate_stops_on_rejected_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_predicate(
            RetryPolicy::exponential(3),
            || {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "error",
                    ))
                }
            },
            |err| err.kind() == std::io::ErrorKind::TimedOut,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
