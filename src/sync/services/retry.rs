//! Explicit retry policy for collaborator calls.
//!
//! Transient failures (network, auth hiccups, timeouts) are retried with
//! exponential backoff up to a bounded attempt count; permanent failures
//! return immediately. Every attempt runs under a bounded timeout so the
//! engine never holds a per-link critical section across an unbounded
//! wait.

use crate::sync::ports::{TaskStoreError, TrackerError};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

/// Collaborator errors the retry policy can classify.
pub trait RetryableError: std::error::Error + Send {
    /// Returns `true` when retrying the operation may succeed.
    fn is_transient(&self) -> bool;

    /// Constructs the error representing a timed-out attempt.
    fn from_timeout(elapsed: Duration) -> Self;
}

impl RetryableError for TrackerError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    fn from_timeout(elapsed: Duration) -> Self {
        Self::Unavailable(format!("call timed out after {elapsed:?}"))
    }
}

impl RetryableError for TaskStoreError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    fn from_timeout(elapsed: Duration) -> Self {
        Self::Unavailable(format!("call timed out after {elapsed:?}"))
    }
}

/// Failure of a retried operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError<E: std::error::Error> {
    /// All attempts failed transiently.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The final transient failure.
        last: E,
    },

    /// A non-transient failure; retrying would not help.
    #[error(transparent)]
    Permanent(E),
}

/// Bounded-attempt exponential backoff policy with a per-call timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            3,
            Duration::from_millis(100),
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
    }
}

impl RetryPolicy {
    /// Creates a retry policy. At least one attempt is always made.
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            initial_backoff,
            max_backoff,
            call_timeout,
        }
    }

    /// Returns the configured attempt bound.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the retry following attempt number `attempt`
    /// (zero-indexed): `initial * 2^attempt`, capped at the maximum.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let millis = u64::try_from(self.initial_backoff.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(millis).min(self.max_backoff)
    }

    /// Runs `operation` until it succeeds, fails permanently, or the
    /// attempt bound is exhausted. Each attempt is bounded by the call
    /// timeout; an elapsed timeout counts as a transient failure.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Permanent`] for non-transient failures and
    /// [`RetryError::Exhausted`] once transient retries run out.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: RetryableError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0_u32;
        loop {
            let failure = match timeout(self.call_timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => {
                    if !err.is_transient() {
                        return Err(RetryError::Permanent(err));
                    }
                    err
                }
                Err(_elapsed) => E::from_timeout(self.call_timeout),
            };

            attempt += 1;
            if attempt >= self.max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }
            sleep(self.backoff_for(attempt - 1)).await;
        }
    }
}
