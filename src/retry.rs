//! At-least-once execution for side effects issued after a commit.
//!
//! Notifications and chat-thread binding run outside the atomic boundary of
//! a task transition. They are retried with backoff and never fail the
//! operation that triggered them; once retries run out the caller hands the
//! effect to the outbox.

use crate::config::RetryPolicy;
use std::fmt::{Debug, Display};
use std::future::Future;
use thiserror::Error;
use tracing::warn;

/// The final failure of a side effect whose attempts are spent.
#[derive(Debug, Error)]
#[error("{effect} failed after {attempts} attempts: {last_error}")]
pub struct RetriesExhausted<E: Debug + Display> {
    /// Effect name.
    pub effect: &'static str,
    /// Attempts made.
    pub attempts: u32,
    /// Error from the last attempt.
    pub last_error: E,
}

/// Runs `operation` until it succeeds or the policy's attempts are spent.
///
/// # Errors
///
/// Returns [`RetriesExhausted`] carrying the last error after the final
/// failure.
pub async fn retry_side_effect<T, E, F, Fut>(
    effect: &'static str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, RetriesExhausted<E>>
where
    E: Debug + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                warn!(effect, attempt, error = %err, "side effect failed, retrying");
                tokio::time::sleep(policy.backoff_after(attempt)).await;
                attempt += 1;
            }
            Err(last_error) => {
                return Err(RetriesExhausted {
                    effect,
                    attempts: attempt,
                    last_error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::retry_side_effect;
    use crate::config::RetryPolicy;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 1,
    };

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = retry_side_effect("test", FAST, || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err("transient")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = retry_side_effect("test", FAST, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err("down") }
        })
        .await;

        let exhausted = result.expect_err("every attempt failed");
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error, "down");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
