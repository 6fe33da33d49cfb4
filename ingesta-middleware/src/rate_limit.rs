//! Sliding-window log limiter.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use ingesta_core::{IngestError, RateLimitConfig};
use tokio::time::Instant;

/// Admits at most `calls` acquisitions within any `window`.
///
/// Each admitted call is logged with its admission instant. A caller over
/// budget sleeps until the oldest logged call leaves the window, then
/// re-checks; the check and the log append happen under one lock so
/// concurrent callers cannot over-admit.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    provider: String,
    config: RateLimitConfig,
    log: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Limiter for `provider` with the given budget.
    pub fn new(provider: impl Into<String>, config: RateLimitConfig) -> Self {
        Self {
            provider: provider.into(),
            config,
            log: Mutex::new(VecDeque::new()),
        }
    }

    /// Configured budget.
    #[must_use]
    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Admit now, or report how long until a slot frees.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut log = self.log.lock().expect("mutex poisoned");
        while let Some(&oldest) = log.front() {
            if oldest + self.config.window <= now {
                log.pop_front();
            } else {
                break;
            }
        }
        if log.len() < self.config.calls as usize {
            log.push_back(now);
            return Ok(());
        }
        let wait = log
            .front()
            .map_or(self.config.window, |&oldest| {
                (oldest + self.config.window).saturating_duration_since(now)
            });
        Err(wait)
    }

    /// Wait for a slot, giving up once the required wait would exceed `wait_timeout`.
    ///
    /// # Errors
    /// Returns `ProviderRateLimit` carrying the outstanding wait when the
    /// deadline cannot be met, or immediately when the budget is zero.
    pub async fn acquire(&self, wait_timeout: Duration) -> Result<(), IngestError> {
        if self.config.calls == 0 {
            return Err(IngestError::rate_limited(&self.provider, None));
        }
        let deadline = Instant::now() + wait_timeout;
        loop {
            match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    let now = Instant::now();
                    if now + wait > deadline {
                        let reset_in_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
                        #[cfg(feature = "tracing")]
                        tracing::debug!(provider = %self.provider, reset_in_ms, "rate limit wait exceeds timeout");
                        return Err(IngestError::rate_limited(&self.provider, Some(reset_in_ms)));
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Calls admitted within the last window.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        let log = self.log.lock().expect("mutex poisoned");
        log.iter()
            .filter(|&&t| t + self.config.window > now)
            .count()
    }
}
