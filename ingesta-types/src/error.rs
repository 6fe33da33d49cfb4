//! Error taxonomy shared by every ingesta crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the ingesta workspace.
///
/// The four `Provider*` variants are the normalized provider taxonomy that
/// retry, fallback and gate logic branch on. Provider SDK errors never leak
/// past the provider client; they are mapped into one of these first.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// Credentials were rejected or missing. Fatal: a configuration problem.
    #[error("{provider} rejected credentials: {msg}")]
    ProviderAuth {
        /// Provider name.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The provider (or the local limiter) refused the call for rate reasons.
    #[error("{provider} rate limited: reset_in_ms={reset_in_ms:?}")]
    ProviderRateLimit {
        /// Provider name.
        provider: String,
        /// Milliseconds until a slot is expected to free, when known.
        reset_in_ms: Option<u64>,
    },

    /// Transient request failure (network, 5xx, timeouts).
    #[error("{provider} request failed: {msg}")]
    ProviderRequest {
        /// Provider name.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The provider answered with something that does not match its contract. Fatal.
    #[error("{provider} returned an unparseable response: {msg}")]
    ProviderParse {
        /// Provider name.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// An individual provider call exceeded the configured timeout.
    #[error("provider timed out: {capability} via {provider}")]
    ProviderTimeout {
        /// Provider name.
        provider: String,
        /// Capability label (data type) of the call.
        capability: String,
    },

    /// Provider was skipped because its health state is `Unavailable`.
    #[error("provider unavailable: {provider}")]
    ProviderUnavailable {
        /// Provider name.
        provider: String,
    },

    /// The requested capability is not implemented by the target provider(s).
    #[error("unsupported capability: {capability}")]
    Unsupported {
        /// Capability label, e.g. "news".
        capability: String,
    },

    /// A fetched row failed validation. Fatal for that row only.
    #[error("validation failed: {0}")]
    Validation(String),

    /// All retry attempts failed; carries every attempt's error in order.
    #[error("retries exhausted after {} attempts", .attempts.len())]
    RetriesExhausted {
        /// One error per attempt, oldest first.
        attempts: Vec<IngestError>,
    },

    /// A workflow gate did not pass.
    #[error("gate {gate} failed (retryable={retryable}): {reason}")]
    GateFailure {
        /// Gate name.
        gate: String,
        /// Why the gate failed.
        reason: String,
        /// Whether another attempt may succeed.
        retryable: bool,
    },

    /// All selected providers failed; contains the individual failures.
    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<IngestError>),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid input argument or configuration.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A resource could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "dead letter 7".
        what: String,
    },

    /// Work was not started because the batch was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl IngestError {
    /// Helper: build a `ProviderAuth` error.
    pub fn auth(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderAuth {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `ProviderRequest` error.
    pub fn request(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderRequest {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `ProviderParse` error.
    pub fn parse(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderParse {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `ProviderRateLimit` error.
    pub fn rate_limited(provider: impl Into<String>, reset_in_ms: Option<u64>) -> Self {
        Self::ProviderRateLimit {
            provider: provider.into(),
            reset_in_ms,
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(provider: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build an `Unsupported` error for a capability string.
    #[must_use]
    pub fn unsupported(cap: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: cap.into(),
        }
    }

    /// Helper: build a `GateFailure` error.
    pub fn gate(gate: impl Into<String>, reason: impl Into<String>, retryable: bool) -> Self {
        Self::GateFailure {
            gate: gate.into(),
            reason: reason.into(),
            retryable,
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether another attempt at the same operation may succeed.
    ///
    /// Aggregates are retryable when any contained failure other than a
    /// cooldown skip is; a provider sitting out its cooldown will still be
    /// skipped on the next attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderRateLimit { .. }
            | Self::ProviderRequest { .. }
            | Self::ProviderTimeout { .. }
            | Self::ProviderUnavailable { .. }
            | Self::Storage(_) => true,
            Self::GateFailure { retryable, .. } => *retryable,
            Self::AllProvidersFailed(inner) => inner
                .iter()
                .filter(|e| !matches!(e, Self::ProviderUnavailable { .. }))
                .any(Self::is_retryable),
            Self::ProviderAuth { .. }
            | Self::ProviderParse { .. }
            | Self::Unsupported { .. }
            | Self::Validation(_)
            | Self::RetriesExhausted { .. }
            | Self::InvalidArg(_)
            | Self::NotFound { .. }
            | Self::Cancelled(_) => false,
        }
    }

    /// Whether this error is a terminal failure record: retries were exhausted
    /// somewhere underneath, or a gate failed fatally.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::RetriesExhausted { .. } => true,
            Self::GateFailure { retryable, .. } => !*retryable,
            Self::AllProvidersFailed(inner) => inner.iter().any(Self::is_terminal),
            _ => false,
        }
    }

    /// Whether this error means the provider itself is misbehaving.
    ///
    /// Rate-limit refusals and capability absence do not count against health.
    #[must_use]
    pub const fn counts_against_health(&self) -> bool {
        matches!(
            self,
            Self::ProviderAuth { .. }
                | Self::ProviderRequest { .. }
                | Self::ProviderParse { .. }
                | Self::ProviderTimeout { .. }
        )
    }

    /// Provider name carried by provider-tagged variants.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderAuth { provider, .. }
            | Self::ProviderRateLimit { provider, .. }
            | Self::ProviderRequest { provider, .. }
            | Self::ProviderParse { provider, .. }
            | Self::ProviderTimeout { provider, .. }
            | Self::ProviderUnavailable { provider } => Some(provider),
            _ => None,
        }
    }

    /// Flatten nested `AllProvidersFailed` and `RetriesExhausted` structures into a plain vector.
    ///
    /// This preserves other error variants as-is and unwraps recursively.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllProvidersFailed(list) | Self::RetriesExhausted { attempts: list } => {
                list.into_iter().flat_map(Self::flatten).collect()
            }
            other => vec![other],
        }
    }
}
