//! Explicit retry with exponential backoff and symmetric jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::{IngestError, RetryConfig};

/// Why [`RetryPolicy::execute`] gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The predicate classified an error as fatal; no further attempts were made.
    Fatal {
        /// The fatal error.
        error: E,
        /// Attempts made, including the fatal one.
        attempts: u32,
    },
    /// Every attempt failed with a retryable error.
    Exhausted {
        /// One error per attempt, oldest first.
        attempts: Vec<E>,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    #[must_use]
    pub fn attempts_used(&self) -> u32 {
        match self {
            Self::Fatal { attempts, .. } => *attempts,
            Self::Exhausted { attempts } => u32::try_from(attempts.len()).unwrap_or(u32::MAX),
        }
    }

    /// The most recent error.
    #[must_use]
    pub fn last(&self) -> Option<&E> {
        match self {
            Self::Fatal { error, .. } => Some(error),
            Self::Exhausted { attempts } => attempts.last(),
        }
    }
}

impl From<RetryError<IngestError>> for IngestError {
    fn from(e: RetryError<IngestError>) -> Self {
        match e {
            RetryError::Fatal { error, .. } => error,
            RetryError::Exhausted { attempts } => Self::RetriesExhausted { attempts },
        }
    }
}

/// Retry executor shared by provider clients and the orchestrator.
///
/// Behavior and trade-offs:
/// - Delay before attempt `n + 1` is `min(max_delay, base_delay * 2^(n-1))`,
///   scaled by a uniform factor in `[1 - jitter, 1 + jitter]`.
/// - Backoff sleeps with `tokio::time::sleep`, so only the calling task waits.
/// - A fatal error returns immediately without spending the remaining attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Policy from explicit settings. `max_attempts` of zero is treated as one.
    #[must_use]
    pub fn new(mut config: RetryConfig) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        config.jitter_fraction = config.jitter_fraction.clamp(0.0, 1.0);
        Self { config }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_fraction: 0.0,
        })
    }

    /// Settings in effect.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Maximum attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exp;
        self.config
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay)
    }

    /// Jittered delay after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        let jitter = self.config.jitter_fraction;
        if jitter == 0.0 || base.is_zero() {
            return base;
        }
        let factor = rand::rng().random_range((1.0 - jitter)..=(1.0 + jitter));
        base.mul_f64(factor)
    }

    /// Run `op` until it succeeds, returns a fatal error, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. `is_retryable` decides, per
    /// error, whether another attempt is allowed.
    ///
    /// # Errors
    /// Returns [`RetryError::Fatal`] on the first non-retryable error and
    /// [`RetryError::Exhausted`] with every attempt's error otherwise.
    pub async fn execute<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut errors = Vec::new();
        for attempt in 1..=self.config.max_attempts {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) if !is_retryable(&e) => {
                    return Err(RetryError::Fatal { error: e, attempts: attempt });
                }
                Err(e) => {
                    errors.push(e);
                    if attempt < self.config.max_attempts {
                        let delay = self.delay_for(attempt);
                        #[cfg(feature = "tracing")]
                        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(RetryError::Exhausted { attempts: errors })
    }
}
