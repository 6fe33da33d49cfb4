//! Configuration types shared across the orchestrator and provider clients.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::IngestError;

/// Calls-per-window budget for a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of calls within any window.
    pub calls: u32,
    /// Length of the sliding window.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calls: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (>= 1).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay before jitter.
    pub max_delay: Duration,
    /// Fraction in [0, 1] of symmetric jitter applied to each delay.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.2,
        }
    }
}

/// Thresholds driving provider health transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Consecutive failures that move a provider to `Degraded`.
    pub degrade_after: u32,
    /// Consecutive failures that move a provider to `Unavailable`.
    pub unavailable_after: u32,
    /// Consecutive successes that move a provider back to `Healthy`.
    pub recover_after: u32,
    /// How long an `Unavailable` provider is skipped before it may be probed again.
    pub cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            degrade_after: 3,
            unavailable_after: 6,
            recover_after: 2,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Per-provider settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider name; must match the adapter's `name()`.
    pub name: String,
    /// Routing priority; lower values are tried first.
    pub priority: u32,
    /// API key handed to the adapter at construction time.
    pub api_key: Option<String>,
    /// Calls allowed per `rate_limit_window`.
    pub rate_limit_calls: u32,
    /// Sliding window for `rate_limit_calls`.
    pub rate_limit_window: Duration,
    /// Timeout for a single physical call.
    pub call_timeout: Duration,
    /// Longest a caller will wait for a free rate-limit slot.
    pub rate_limit_wait_timeout: Duration,
}

impl ProviderSettings {
    /// Settings with defaults for everything but the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The rate-limit budget as a single value.
    #[must_use]
    pub const fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            calls: self.rate_limit_calls,
            window: self.rate_limit_window,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let rl = RateLimitConfig::default();
        Self {
            name: String::new(),
            priority: 100,
            api_key: None,
            rate_limit_calls: rl.calls,
            rate_limit_window: rl.window,
            call_timeout: Duration::from_secs(10),
            rate_limit_wait_timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("rate_limit_calls", &self.rate_limit_calls)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("call_timeout", &self.call_timeout)
            .field("rate_limit_wait_timeout", &self.rate_limit_wait_timeout)
            .finish()
    }
}

/// Row requirement checked by the ingestion gate for one data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestionRequirement {
    /// Rows that must be present in the requested range; fewer is a retryable failure.
    pub min_rows: usize,
    /// Whether the type is mandatory; only mandatory types can fail fatally.
    pub mandatory: bool,
    /// For mandatory types, a row count at or below this value is fatal.
    pub fatal_floor: usize,
}

/// Workflow gate thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Ingestion requirements per data type; unlisted types use the default (always pass).
    pub ingestion: BTreeMap<DataType, IngestionRequirement>,
    /// Indicator names that must be defined for the most recent period.
    pub required_indicators: Vec<String>,
    /// Complete indicator periods needed before signal generation may run.
    pub signal_min_lookback: usize,
}

impl GateConfig {
    /// Ingestion requirement for a data type.
    #[must_use]
    pub fn requirement(&self, data_type: DataType) -> IngestionRequirement {
        self.ingestion.get(&data_type).copied().unwrap_or_default()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        let mut ingestion = BTreeMap::new();
        ingestion.insert(
            DataType::PriceHistorical,
            IngestionRequirement {
                min_rows: 1,
                mandatory: true,
                fatal_floor: 0,
            },
        );
        Self {
            ingestion,
            required_indicators: Vec::new(),
            signal_min_lookback: 20,
        }
    }
}

/// Global configuration for the refresh orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Local hour (market timezone) of the daily scheduled run.
    pub batch_schedule_hour: u32,
    /// Local minute of the daily scheduled run.
    pub batch_schedule_minute: u32,
    /// Length of the window after the scheduled time during which scheduled refreshes run.
    pub schedule_window_minutes: u32,
    /// IANA timezone of the market calendar, e.g. "America/New_York".
    pub market_timezone: String,
    /// Exchange holidays; weekends are always closed.
    pub market_holidays: Vec<NaiveDate>,
    /// Default interval for periodic refreshes.
    pub periodic_update_interval_minutes: u64,
    /// Per data type overrides of the periodic interval.
    pub periodic_overrides: BTreeMap<DataType, Duration>,
    /// When true, live mode refreshes unconditionally.
    pub enable_live_updates: bool,
    /// Periodic interval used by live mode when live updates are disabled.
    pub live_fallback_interval: Duration,
    /// Minimum data age before a non-forced on-demand request refetches.
    pub on_demand_min_freshness: Duration,
    /// Attempts per (symbol, data type) unit, including the first.
    pub data_fetch_retry_attempts: u32,
    /// Base backoff delay between attempts.
    pub data_fetch_retry_delay: Duration,
    /// Cap on a single backoff delay.
    pub retry_max_delay: Duration,
    /// Symmetric jitter fraction applied to backoff delays.
    pub retry_jitter_fraction: f64,
    /// Symbols processed concurrently within one batch.
    pub max_concurrent_symbols: usize,
    /// Optional deadline after which a batch stops starting new work.
    pub batch_timeout: Option<Duration>,
    /// Days of daily history requested when a symbol has no stored prices.
    pub history_lookback_days: u32,
    /// Hours of intraday bars requested when a symbol has none stored.
    pub intraday_lookback_hours: u32,
    /// Default health thresholds applied to every provider.
    pub health: HealthConfig,
    /// Workflow gate thresholds.
    pub gates: GateConfig,
    /// Provider settings by name.
    pub providers: Vec<ProviderSettings>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            batch_schedule_hour: 18,
            batch_schedule_minute: 0,
            schedule_window_minutes: 60,
            market_timezone: "America/New_York".to_string(),
            market_holidays: Vec::new(),
            periodic_update_interval_minutes: 15,
            periodic_overrides: BTreeMap::new(),
            enable_live_updates: false,
            live_fallback_interval: Duration::from_secs(60),
            on_demand_min_freshness: Duration::from_secs(300),
            data_fetch_retry_attempts: 3,
            data_fetch_retry_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            retry_jitter_fraction: 0.2,
            max_concurrent_symbols: 4,
            batch_timeout: None,
            history_lookback_days: 365,
            intraday_lookback_hours: 24,
            health: HealthConfig::default(),
            gates: GateConfig::default(),
            providers: Vec::new(),
        }
    }
}

impl RefreshConfig {
    /// Parse a configuration document; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the document is not valid JSON for this schema.
    pub fn from_json_str(s: &str) -> Result<Self, IngestError> {
        serde_json::from_str(s).map_err(|e| IngestError::InvalidArg(format!("config: {e}")))
    }

    /// Periodic interval for a data type, honoring overrides.
    #[must_use]
    pub fn periodic_interval(&self, data_type: DataType) -> Duration {
        self.periodic_overrides
            .get(&data_type)
            .copied()
            .unwrap_or_else(|| Duration::from_secs(self.periodic_update_interval_minutes * 60))
    }

    /// Retry settings for the per-unit retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.data_fetch_retry_attempts,
            base_delay: self.data_fetch_retry_delay,
            max_delay: self.retry_max_delay,
            jitter_fraction: self.retry_jitter_fraction,
        }
    }

    /// Settings for a provider by name, if configured.
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.name == name)
    }
}
