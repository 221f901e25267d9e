//! Retry controller.
//!
//! Runs an async operation up to `max_attempts` times. The first attempt runs
//! immediately; each transient failure is followed by a backoff sleep from
//! the [`RetryPolicy`]. A failure the classifier marks permanent ends the loop
//! at once.
//!
//! Cancellation interrupts backoff sleeps and prevents further attempts. An
//! attempt that is already running is left to finish so its result is not
//! lost.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::policy::RetryPolicy;
use crate::error::ErrorClass;

/// Why a retried operation gave up.
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Display> {
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with a permanent error.
    #[error("permanent failure on attempt {attempts}: {error}")]
    Permanent { attempts: u32, error: E },

    /// The caller cancelled before the operation succeeded.
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E: fmt::Display> RetryError<E> {
    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The underlying failure, unless cancelled.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Permanent { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Bookkeeping for one `execute` call. Never outlives it.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    max_attempts: u32,
    current_delay: Duration,
    max_delay: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts(),
            current_delay: Duration::ZERO,
            max_delay: policy.max_delay(),
        }
    }

    /// Advance to the next attempt number.
    fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Compute the backoff after the current attempt, or `None` if exhausted.
    fn next_delay(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let delay = policy.delay_for_attempt(self.attempt)?.min(self.max_delay);
        self.current_delay = delay;
        Some(delay)
    }
}

/// Executes operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    /// Create a controller with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails permanently, runs out of attempts, or
    /// `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. `classify` decides whether a
    /// failure is worth retrying.
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        mut op: F,
        classify: C,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> ErrorClass,
        E: fmt::Display,
    {
        let mut state = RetryState::new(&self.policy);

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled {
                    attempts: state.attempt,
                });
            }

            let attempt = state.begin_attempt();
            let error = match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Retried operation succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if classify(&error) == ErrorClass::Permanent {
                debug!(attempt, error = %error, "Permanent failure, not retrying");
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    error,
                });
            }

            let Some(delay) = state.next_delay(&self.policy) else {
                warn!(attempts = attempt, error = %error, "Retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            };

            warn!(
                attempt,
                max_attempts = state.max_attempts,
                delay_ms = state.current_delay.as_millis() as u64,
                error = %error,
                "Transient failure, backing off"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "Backoff interrupted by cancellation");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
