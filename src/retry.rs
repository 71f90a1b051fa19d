//! Retry policy shared by every outbound call of the hairstyle phase.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StylistError};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `step * attempt` after the n-th failed attempt.
    Linear { step: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1).
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_secs(2)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(1, Backoff::None)
    }

    /// Delay before the next attempt after `attempt` (1-based) failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Linear { step } => step * attempt,
        }
    }
}

/// Run `operation` under `policy`.
///
/// Only errors for which [`StylistError::is_retryable`] holds are retried.
/// Cancellation, whether observed during a call or during a backoff wait,
/// ends the loop with [`StylistError::Cancelled`].
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(StylistError::Cancelled);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(StylistError::Cancelled),
            r = operation(attempt) => r,
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = label, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) if !err.is_retryable() || attempt >= max_attempts => {
                if attempt > 1 {
                    tracing::warn!(
                        operation = label,
                        attempt,
                        error = %err,
                        "Giving up after retries"
                    );
                }
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(StylistError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
