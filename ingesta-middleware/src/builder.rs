//! Builder for wrapping a raw provider adapter into a [`RateLimitedProviderClient`].

use std::sync::Arc;
use std::time::Duration;

use ingesta_core::{
    DataProvider, HealthConfig, ProviderSettings, RateLimitConfig, RetryConfig, RetryPolicy,
};

use crate::client::RateLimitedProviderClient;

/// Builder for a [`RateLimitedProviderClient`].
pub struct ProviderClientBuilder {
    raw: Arc<dyn DataProvider>,
    settings: ProviderSettings,
    health: HealthConfig,
    retry: RetryPolicy,
}

impl ProviderClientBuilder {
    /// Start from a raw adapter with default settings.
    #[must_use]
    pub fn new(raw: Arc<dyn DataProvider>) -> Self {
        let settings = ProviderSettings::named(raw.name());
        Self {
            raw,
            settings,
            health: HealthConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace all per-provider settings at once (e.g. from a config file).
    #[must_use]
    pub fn settings(mut self, settings: ProviderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Routing priority; lower is preferred.
    #[must_use]
    pub const fn priority(mut self, priority: u32) -> Self {
        self.settings.priority = priority;
        self
    }

    /// Allow at most `calls` calls in any sliding `window`.
    ///
    /// Behavior and trade-offs:
    /// - Callers over budget wait for the oldest call to age out rather than
    ///   failing immediately; see [`rate_limit_wait_timeout`](Self::rate_limit_wait_timeout).
    /// - A zero budget makes every call fail with `ProviderRateLimit`.
    #[must_use]
    pub const fn rate_limit(mut self, cfg: RateLimitConfig) -> Self {
        self.settings.rate_limit_calls = cfg.calls;
        self.settings.rate_limit_window = cfg.window;
        self
    }

    /// Bound each physical provider call.
    #[must_use]
    pub const fn call_timeout(mut self, timeout: Duration) -> Self {
        self.settings.call_timeout = timeout;
        self
    }

    /// Longest a caller waits for a rate-limit slot before failing.
    ///
    /// Behavior and trade-offs:
    /// - Long waits keep throughput at the budget but hold workers idle.
    /// - Short waits surface `ProviderRateLimit` sooner, letting fallback move
    ///   on to another provider.
    #[must_use]
    pub const fn rate_limit_wait_timeout(mut self, timeout: Duration) -> Self {
        self.settings.rate_limit_wait_timeout = timeout;
        self
    }

    /// Health thresholds.
    #[must_use]
    pub const fn health(mut self, cfg: HealthConfig) -> Self {
        self.health = cfg;
        self
    }

    /// Retry settings for transient provider errors.
    #[must_use]
    pub fn retry(mut self, cfg: RetryConfig) -> Self {
        self.retry = RetryPolicy::new(cfg);
        self
    }

    /// Disable client-level retries (one attempt per fetch).
    #[must_use]
    pub fn no_retry(mut self) -> Self {
        self.retry = RetryPolicy::none();
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Arc<RateLimitedProviderClient> {
        Arc::new(RateLimitedProviderClient::new(
            self.raw,
            self.settings,
            self.health,
            self.retry,
        ))
    }
}
