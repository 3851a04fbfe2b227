//! Retry policy for remote calls
//!
//! A failed attempt is classified into a [`FailureKind`]; the kind picks the
//! backoff curve. Protocol faults are never retried. The total number of
//! attempts never exceeds `max_attempts`, and there is no wait after the
//! final attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429: exponential backoff from `rate_limit_base`
    RateLimited,
    /// HTTP 503: linear backoff in steps of `unavailable_step`
    Unavailable,
    /// Timeouts, broken connections, other HTTP errors: exponential backoff
    /// from `transient_base`
    Transient,
    /// Malformed responses: fail immediately
    Fatal,
}

/// Errors the policy can classify
pub trait Retryable: Display {
    fn failure_kind(&self) -> FailureKind;
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// A non-retryable failure on the given attempt
    Fatal { attempt: u32, error: E },
    /// Every allowed attempt failed
    Exhausted { attempts: u32, last_error: E },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base: Duration,
    pub unavailable_step: Duration,
    pub transient_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_millis(2000),
            unavailable_step: Duration::from_millis(5000),
            transient_base: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Wait before retrying after `attempt` (1-based) failed with `kind`
    ///
    /// Returns `None` when the failure must not be retried.
    pub fn delay_for(&self, kind: FailureKind, attempt: u32) -> Option<Duration> {
        let exponent = 1u32 << attempt.min(16);
        match kind {
            FailureKind::RateLimited => Some(self.rate_limit_base.saturating_mul(exponent)),
            FailureKind::Unavailable => Some(self.unavailable_step.saturating_mul(attempt)),
            FailureKind::Transient => Some(self.transient_base.saturating_mul(exponent)),
            FailureKind::Fatal => None,
        }
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryFailure<E>>
    where
        E: Retryable,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let kind = error.failure_kind();
            let Some(delay) = self.delay_for(kind, attempt) else {
                tracing::error!(operation, attempt, error = %error, "Non-retryable failure");
                return Err(RetryFailure::Fatal { attempt, error });
            };

            if attempt >= max_attempts {
                tracing::error!(
                    operation,
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(RetryFailure::Exhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            tracing::warn!(
                operation,
                attempt,
                max_attempts,
                kind = ?kind,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
