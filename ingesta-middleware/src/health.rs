//! Provider health tracking.

use std::sync::Mutex;

use ingesta_core::{HealthConfig, ProviderHealth};
use tokio::time::Instant;

/// Tracks consecutive outcomes of a provider and derives its [`ProviderHealth`].
///
/// An `Unavailable` provider stays unavailable for `cooldown`; afterwards it
/// reads as `Degraded` so routing may probe it again. One more failure
/// while the failure streak is still at the threshold trips it back.
#[derive(Debug)]
pub struct HealthTracker {
    provider: String,
    config: HealthConfig,
    state: Mutex<HealthState>,
}

#[derive(Debug, Default)]
struct HealthState {
    health: ProviderHealth,
    consecutive_failures: u32,
    consecutive_successes: u32,
    unavailable_until: Option<Instant>,
}

impl HealthState {
    fn expire_cooldown(&mut self, now: Instant) {
        if let Some(until) = self.unavailable_until
            && now >= until
        {
            self.unavailable_until = None;
            self.health = ProviderHealth::Degraded;
        }
    }
}

impl HealthTracker {
    /// Tracker for `provider`, starting `Healthy`.
    pub fn new(provider: impl Into<String>, config: HealthConfig) -> Self {
        Self {
            provider: provider.into(),
            config,
            state: Mutex::new(HealthState::default()),
        }
    }

    /// Current health, applying cool-down expiry.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn current(&self) -> ProviderHealth {
        let mut st = self.state.lock().expect("mutex poisoned");
        st.expire_cooldown(Instant::now());
        st.health
    }

    /// Record a successful call.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn record_success(&self) {
        let mut st = self.state.lock().expect("mutex poisoned");
        st.expire_cooldown(Instant::now());
        st.consecutive_failures = 0;
        st.consecutive_successes = st.consecutive_successes.saturating_add(1);
        if st.health != ProviderHealth::Healthy
            && st.consecutive_successes >= self.config.recover_after
        {
            st.health = ProviderHealth::Healthy;
            st.unavailable_until = None;
            #[cfg(feature = "tracing")]
            tracing::info!(provider = %self.provider, "provider recovered");
        }
    }

    /// Record a failure that counts against health.
    ///
    /// # Panics
    /// Panics if the internal mutex is poisoned.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut st = self.state.lock().expect("mutex poisoned");
        st.expire_cooldown(now);
        st.consecutive_successes = 0;
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        if st.consecutive_failures >= self.config.unavailable_after {
            if st.health != ProviderHealth::Unavailable {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    provider = %self.provider,
                    failures = st.consecutive_failures,
                    cooldown_ms = u64::try_from(self.config.cooldown.as_millis()).unwrap_or(u64::MAX),
                    "provider unavailable"
                );
            }
            st.health = ProviderHealth::Unavailable;
            st.unavailable_until = Some(now + self.config.cooldown);
        } else if st.consecutive_failures >= self.config.degrade_after
            && st.health == ProviderHealth::Healthy
        {
            st.health = ProviderHealth::Degraded;
            #[cfg(feature = "tracing")]
            tracing::warn!(provider = %self.provider, failures = st.consecutive_failures, "provider degraded");
        }
    }

    /// Provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }
}
