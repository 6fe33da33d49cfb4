//! Rate-limited, retrying, health-tracked wrapper around one provider adapter.

use std::sync::Arc;
use std::time::Duration;

use ingesta_core::{
    DataProvider, DataType, FetchParams, HealthConfig, IngestError, Payload, ProviderHealth,
    ProviderRecord, ProviderSettings, RetryPolicy, fetch_payload,
};

use crate::health::HealthTracker;
use crate::rate_limit::SlidingWindowLimiter;

/// Client through which every call to a provider goes.
///
/// Per logical `fetch`:
/// 1. each physical attempt waits for a rate-limit slot (bounded by
///    `rate_limit_wait_timeout`),
/// 2. runs under `call_timeout`,
/// 3. has its error normalized into the provider taxonomy and tagged with the
///    provider name,
/// 4. updates health (rate-limit refusals and capability gaps excluded);
///
/// and attempts are repeated by the retry policy for `ProviderRequest` and
/// `ProviderRateLimit` only.
pub struct RateLimitedProviderClient {
    provider: Arc<dyn DataProvider>,
    settings: ProviderSettings,
    limiter: SlidingWindowLimiter,
    health: HealthTracker,
    retry: RetryPolicy,
}

impl std::fmt::Debug for RateLimitedProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedProviderClient")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RateLimitedProviderClient {
    /// Wrap `provider`. The settings name is replaced by the provider's own name.
    pub fn new(
        provider: Arc<dyn DataProvider>,
        mut settings: ProviderSettings,
        health: HealthConfig,
        retry: RetryPolicy,
    ) -> Self {
        settings.name = provider.name().to_string();
        Self {
            limiter: SlidingWindowLimiter::new(provider.name(), settings.rate_limit()),
            health: HealthTracker::new(provider.name(), health),
            provider,
            settings,
            retry,
        }
    }

    /// Provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    /// Routing priority; lower is preferred.
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.settings.priority
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Whether the wrapped provider's roles cover `data_type`.
    #[must_use]
    pub fn supports(&self, data_type: DataType) -> bool {
        self.provider.supports(data_type)
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> ProviderHealth {
        self.health.current()
    }

    /// The limiter guarding this provider.
    #[must_use]
    pub const fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Snapshot for reporting.
    #[must_use]
    pub fn record(&self) -> ProviderRecord {
        ProviderRecord {
            name: self.name().to_string(),
            priority: self.priority(),
            rate_limit: self.settings.rate_limit(),
            health: self.health(),
        }
    }

    /// Fetch `data_type` rows for `symbol`.
    ///
    /// # Errors
    /// `Unsupported` without touching the limiter when the provider lacks the
    /// role; the fatal error of the first non-retryable attempt; or
    /// `RetriesExhausted` carrying every attempt's error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "ingesta::client::fetch",
            skip(self, params),
            fields(provider = self.name(), data_type = %data_type, symbol = %symbol),
        )
    )]
    pub async fn fetch(
        &self,
        data_type: DataType,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Payload, IngestError> {
        if !self.supports(data_type) {
            return Err(IngestError::unsupported(format!(
                "{data_type} via {}",
                self.name()
            )));
        }
        self.retry
            .execute(
                |_attempt| self.call_once(data_type, symbol, params),
                |e| {
                    matches!(
                        e,
                        IngestError::ProviderRequest { .. } | IngestError::ProviderRateLimit { .. }
                    )
                },
            )
            .await
            .map_err(IngestError::from)
    }

    async fn call_once(
        &self,
        data_type: DataType,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<Payload, IngestError> {
        self.limiter
            .acquire(self.settings.rate_limit_wait_timeout)
            .await?;
        let res = provider_call_with_timeout(
            self.name(),
            data_type,
            self.settings.call_timeout,
            fetch_payload(self.provider.as_ref(), data_type, symbol, params),
        )
        .await
        .and_then(|p| {
            if p.fits(data_type) {
                Ok(p)
            } else {
                Err(IngestError::parse(
                    self.name(),
                    format!("payload shape does not match {data_type}"),
                ))
            }
        })
        .map_err(|e| normalize(self.name(), e));

        match &res {
            Ok(_) => self.health.record_success(),
            Err(e) if e.counts_against_health() => self.health.record_failure(),
            Err(_) => {}
        }
        res
    }
}

/// Wrap a provider future with a timeout and standardized timeout error mapping.
async fn provider_call_with_timeout<T, Fut>(
    provider: &'static str,
    data_type: DataType,
    timeout: Duration,
    fut: Fut,
) -> Result<T, IngestError>
where
    Fut: Future<Output = Result<T, IngestError>>,
{
    (tokio::time::timeout(timeout, fut).await)
        .unwrap_or_else(|_| Err(IngestError::provider_timeout(provider, data_type.as_str())))
}

/// Map any adapter error into the provider taxonomy, tagged with `provider`.
///
/// Timeouts become `ProviderRequest`. Adapter-side data errors (`NotFound`,
/// `InvalidArg`, `Validation`) become `ProviderParse`. Anything else that is
/// not already a provider error becomes `ProviderRequest`.
#[must_use]
pub fn normalize(provider: &str, err: IngestError) -> IngestError {
    match err {
        IngestError::ProviderAuth { msg, .. } => IngestError::auth(provider, msg),
        IngestError::ProviderRateLimit { reset_in_ms, .. } => {
            IngestError::rate_limited(provider, reset_in_ms)
        }
        IngestError::ProviderRequest { msg, .. } => IngestError::request(provider, msg),
        IngestError::ProviderParse { msg, .. } => IngestError::parse(provider, msg),
        IngestError::ProviderTimeout { capability, .. } => {
            IngestError::request(provider, format!("timed out fetching {capability}"))
        }
        e @ IngestError::Unsupported { .. } => e,
        e @ (IngestError::NotFound { .. }
        | IngestError::InvalidArg(_)
        | IngestError::Validation(_)) => IngestError::parse(provider, e.to_string()),
        other => IngestError::request(provider, other.to_string()),
    }
}
