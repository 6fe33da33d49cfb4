//! Staleness decisions per refresh mode.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ingesta_core::{DataType, IngestError, MarketCalendar, RefreshConfig, RefreshMode};

/// Inputs to a staleness decision for one (symbol, data type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessQuery<'a> {
    /// Symbol being refreshed.
    pub symbol: &'a str,
    /// Data type being refreshed.
    pub data_type: DataType,
    /// Last successful refresh, if any.
    pub last_updated: Option<DateTime<Utc>>,
    /// Current time.
    pub now: DateTime<Utc>,
    /// Caller asked to bypass freshness checks.
    pub force: bool,
}

impl StalenessQuery<'_> {
    fn age(&self) -> Option<Duration> {
        self.last_updated
            .map(|t| (self.now - t).to_std().unwrap_or(Duration::ZERO))
    }
}

/// How staleness is computed for a [`RefreshMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStrategy {
    /// Refresh once per trading day inside the scheduled window.
    Scheduled {
        /// Calendar supplying trading days and the daily boundary.
        calendar: MarketCalendar,
    },
    /// Refresh on request unless the data is younger than `min_freshness`.
    OnDemand {
        /// Minimum age before an unforced request refetches.
        min_freshness: Duration,
    },
    /// Refresh when the data is at least `interval` old.
    Periodic {
        /// Interval for types without an override.
        interval: Duration,
        /// Per-type intervals.
        overrides: BTreeMap<DataType, Duration>,
    },
    /// Refresh every time when live updates are enabled, else on a short period.
    Live {
        /// Whether live updates are enabled.
        enabled: bool,
        /// Period used when live updates are disabled.
        fallback_interval: Duration,
    },
}

impl RefreshStrategy {
    /// Whether `(symbol, data_type)` should be refetched now.
    ///
    /// Unknown `last_updated` always refreshes.
    #[must_use]
    pub fn should_refresh(&self, q: &StalenessQuery<'_>) -> bool {
        let Some(last) = q.last_updated else {
            return true;
        };
        match self {
            Self::Scheduled { calendar } => {
                calendar.in_schedule_window(q.now)
                    && calendar
                        .last_boundary(q.now)
                        .is_some_and(|boundary| last < boundary)
            }
            Self::OnDemand { min_freshness } => {
                q.force || q.age().is_none_or(|age| age >= *min_freshness)
            }
            Self::Periodic {
                interval,
                overrides,
            } => {
                let interval = overrides.get(&q.data_type).unwrap_or(interval);
                q.age().is_none_or(|age| age >= *interval)
            }
            Self::Live {
                enabled,
                fallback_interval,
            } => *enabled || q.age().is_none_or(|age| age >= *fallback_interval),
        }
    }

    /// The mode this strategy serves.
    #[must_use]
    pub const fn mode(&self) -> RefreshMode {
        match self {
            Self::Scheduled { .. } => RefreshMode::Scheduled,
            Self::OnDemand { .. } => RefreshMode::OnDemand,
            Self::Periodic { .. } => RefreshMode::Periodic,
            Self::Live { .. } => RefreshMode::Live,
        }
    }
}

/// One strategy per refresh mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySet {
    scheduled: RefreshStrategy,
    on_demand: RefreshStrategy,
    periodic: RefreshStrategy,
    live: RefreshStrategy,
}

impl StrategySet {
    /// Strategies described by the refresh configuration.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the market calendar settings are invalid.
    pub fn from_config(cfg: &RefreshConfig) -> Result<Self, IngestError> {
        Ok(Self {
            scheduled: RefreshStrategy::Scheduled {
                calendar: MarketCalendar::from_config(cfg)?,
            },
            on_demand: RefreshStrategy::OnDemand {
                min_freshness: cfg.on_demand_min_freshness,
            },
            periodic: RefreshStrategy::Periodic {
                interval: Duration::from_secs(cfg.periodic_update_interval_minutes * 60),
                overrides: cfg.periodic_overrides.clone(),
            },
            live: RefreshStrategy::Live {
                enabled: cfg.enable_live_updates,
                fallback_interval: cfg.live_fallback_interval,
            },
        })
    }

    /// Replace the strategy for the mode `strategy` serves.
    #[must_use]
    pub fn with(mut self, strategy: RefreshStrategy) -> Self {
        match strategy.mode() {
            RefreshMode::Scheduled => self.scheduled = strategy,
            RefreshMode::OnDemand => self.on_demand = strategy,
            RefreshMode::Periodic => self.periodic = strategy,
            RefreshMode::Live => self.live = strategy,
        }
        self
    }

    /// Strategy for `mode`.
    #[must_use]
    pub const fn for_mode(&self, mode: RefreshMode) -> &RefreshStrategy {
        match mode {
            RefreshMode::Scheduled => &self.scheduled,
            RefreshMode::OnDemand => &self.on_demand,
            RefreshMode::Periodic => &self.periodic,
            RefreshMode::Live => &self.live,
        }
    }
}
