//! Provider metadata types usable across crates.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;

/// Typed key for identifying providers in priority configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderKey(pub &'static str);

impl ProviderKey {
    /// Construct a new typed provider key from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the inner static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl From<ProviderKey> for &'static str {
    fn from(k: ProviderKey) -> Self {
        k.0
    }
}

/// Health of a provider as observed by its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderHealth {
    /// Serving normally.
    #[default]
    Healthy,
    /// Recent consecutive failures; still eligible for calls.
    Degraded,
    /// Skipped by fallback routing until its cool-down elapses.
    Unavailable,
}

impl fmt::Display for ProviderHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        })
    }
}

/// Point-in-time snapshot of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider name.
    pub name: String,
    /// Routing priority; lower values are tried first.
    pub priority: u32,
    /// Configured call budget.
    pub rate_limit: RateLimitConfig,
    /// Health at the time of the snapshot.
    pub health: ProviderHealth,
}
