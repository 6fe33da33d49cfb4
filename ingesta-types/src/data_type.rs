//! Data types, pipeline stages and refresh modes.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Kind of market data a refresh operates on.
///
/// Each variant maps to exactly one persistence namespace ([`DataType::table`])
/// and one pipeline [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    /// Daily OHLCV history.
    PriceHistorical,
    /// Intraday OHLCV bars.
    PriceIntraday,
    /// Fundamental metrics snapshots (valuation, margins, balance-sheet ratios).
    Fundamentals,
    /// News articles mentioning the symbol.
    News,
    /// Earnings reports and estimates.
    Earnings,
    /// Technical indicators derived locally from stored price history.
    TechnicalIndicators,
    /// Industry peer relationships.
    IndustryPeers,
    /// Macro-economic series observations (the symbol is the series id).
    Macro,
}

impl DataType {
    /// Every data type, in pipeline order.
    pub const ALL: [Self; 8] = [
        Self::PriceHistorical,
        Self::PriceIntraday,
        Self::Fundamentals,
        Self::News,
        Self::Earnings,
        Self::IndustryPeers,
        Self::Macro,
        Self::TechnicalIndicators,
    ];

    /// Stable, kebab-case identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceHistorical => "price-historical",
            Self::PriceIntraday => "price-intraday",
            Self::Fundamentals => "fundamentals",
            Self::News => "news",
            Self::Earnings => "earnings",
            Self::TechnicalIndicators => "technical-indicators",
            Self::IndustryPeers => "industry-peers",
            Self::Macro => "macro",
        }
    }

    /// Persistence namespace (table) holding rows of this type.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::PriceHistorical => "price_historical",
            Self::PriceIntraday => "price_intraday",
            Self::Fundamentals => "fundamentals",
            Self::News => "news_articles",
            Self::Earnings => "earnings",
            Self::TechnicalIndicators => "technical_indicators",
            Self::IndustryPeers => "industry_peers",
            Self::Macro => "macro_observations",
        }
    }

    /// Pipeline stage that produces this data type.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::TechnicalIndicators => Stage::Indicators,
            _ => Stage::Ingestion,
        }
    }

    /// Whether rows of this type come from an external provider.
    ///
    /// `TechnicalIndicators` is computed locally and never fetched.
    #[must_use]
    pub const fn is_fetched(self) -> bool {
        !matches!(self, Self::TechnicalIndicators)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage of a unit of work. Stages run in declaration order per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Provider fetch, validation and persistence.
    Ingestion,
    /// Indicator computation over stored price history.
    Indicators,
    /// Readiness check for downstream signal generation.
    Signals,
}

impl Stage {
    /// Stable identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Indicators => "indicators",
            Self::Signals => "signals",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refresh mode of a request. Selects the staleness strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RefreshMode {
    /// Daily batch run inside the configured schedule window.
    Scheduled,
    /// Explicit user/operator request.
    #[default]
    OnDemand,
    /// Fixed-interval refresh.
    Periodic,
    /// Live updates; always refresh when enabled.
    Live,
}

impl RefreshMode {
    /// Stable identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::OnDemand => "on-demand",
            Self::Periodic => "periodic",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
