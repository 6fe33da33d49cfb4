use std::collections::HashSet;
use std::sync::Arc;

use ingesta_core::{
    DataProvider, DataType, FetchParams, IngestError, Payload, ProviderHealth, ProviderRecord,
    ProviderSettings, RefreshConfig,
};
use ingesta_middleware::{ProviderClientBuilder, RateLimitedProviderClient};

/// Successful fallback fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackFetch {
    /// Rows returned by the serving provider.
    pub payload: Payload,
    /// Name of the provider that served the payload.
    pub provider: String,
    /// Errors from providers tried (or skipped) before the serving one, in order.
    pub diagnostics: Vec<IngestError>,
}

/// Ordered set of provider clients consulted with fallback.
pub struct ProviderRegistry {
    clients: Vec<Arc<RateLimitedProviderClient>>,
}

/// Builder for a [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    clients: Vec<Arc<RateLimitedProviderClient>>,
}

impl ProviderRegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already wrapped client.
    ///
    /// Behavior and trade-offs:
    /// - Clients are ordered by their `priority` (lower first); registration
    ///   order breaks ties.
    /// - The same client may be shared by several registries; its limiter and
    ///   health then apply across all of them.
    #[must_use]
    pub fn with_client(mut self, client: Arc<RateLimitedProviderClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Wrap a raw adapter with explicit settings and register it.
    #[must_use]
    pub fn with_provider(self, raw: Arc<dyn DataProvider>, settings: ProviderSettings) -> Self {
        self.with_client(ProviderClientBuilder::new(raw).settings(settings).build())
    }

    /// Wrap a raw adapter using the settings `cfg` lists under its name
    /// (defaults otherwise), plus `cfg`'s health and retry settings.
    #[must_use]
    pub fn with_configured_provider(self, raw: Arc<dyn DataProvider>, cfg: &RefreshConfig) -> Self {
        let settings = cfg
            .provider(raw.name())
            .cloned()
            .unwrap_or_else(|| ProviderSettings::named(raw.name()));
        self.with_client(
            ProviderClientBuilder::new(raw)
                .settings(settings)
                .health(cfg.health)
                .retry(cfg.retry())
                .build(),
        )
    }

    /// Build the registry.
    ///
    /// # Errors
    /// Returns `InvalidArg` if no provider is registered or two share a name.
    pub fn build(mut self) -> Result<ProviderRegistry, IngestError> {
        if self.clients.is_empty() {
            return Err(IngestError::InvalidArg(
                "no providers registered; add at least one via with_client(...)".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for c in &self.clients {
            if !seen.insert(c.name()) {
                return Err(IngestError::InvalidArg(format!(
                    "provider '{}' registered twice",
                    c.name()
                )));
            }
        }
        // Stable: equal priorities keep registration order.
        self.clients.sort_by_key(|c| c.priority());
        Ok(ProviderRegistry {
            clients: self.clients,
        })
    }
}

impl ProviderRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::new()
    }

    /// All clients in routing order.
    #[must_use]
    pub fn clients(&self) -> &[Arc<RateLimitedProviderClient>] {
        &self.clients
    }

    /// Clients able to serve `data_type`, in routing order.
    pub fn capable(&self, data_type: DataType) -> impl Iterator<Item = &Arc<RateLimitedProviderClient>> {
        self.clients.iter().filter(move |c| c.supports(data_type))
    }

    /// Whether any registered provider serves `data_type`.
    #[must_use]
    pub fn supports(&self, data_type: DataType) -> bool {
        self.capable(data_type).next().is_some()
    }

    /// Snapshot of every provider, in routing order.
    #[must_use]
    pub fn records(&self) -> Vec<ProviderRecord> {
        self.clients.iter().map(|c| c.record()).collect()
    }

    /// Fetch `data_type` for `symbol` from the first capable provider that succeeds.
    ///
    /// Providers currently `Unavailable` are skipped and noted in the
    /// diagnostics as `ProviderUnavailable`.
    ///
    /// # Errors
    /// `Unsupported` when no registered provider serves the type;
    /// `AllProvidersFailed` with one entry per capable provider otherwise.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "ingesta::registry::fetch_with_fallback",
            skip(self, params),
            fields(data_type = %data_type, symbol = %symbol),
        )
    )]
    pub async fn fetch_with_fallback(
        &self,
        data_type: DataType,
        symbol: &str,
        params: &FetchParams,
    ) -> Result<FallbackFetch, IngestError> {
        let mut attempted_any = false;
        let mut errors: Vec<IngestError> = Vec::new();

        for c in self.capable(data_type) {
            attempted_any = true;
            if c.health() == ProviderHealth::Unavailable {
                #[cfg(feature = "tracing")]
                tracing::debug!(provider = c.name(), "skipping unavailable provider");
                errors.push(IngestError::ProviderUnavailable {
                    provider: c.name().to_string(),
                });
                continue;
            }
            match c.fetch(data_type, symbol, params).await {
                Ok(payload) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        provider = c.name(),
                        earlier_failures = errors.len(),
                        "fetch served"
                    );
                    return Ok(FallbackFetch {
                        payload,
                        provider: c.name().to_string(),
                        diagnostics: errors,
                    });
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(provider = c.name(), error = %e, "provider failed; trying next");
                    errors.push(e);
                }
            }
        }

        if !attempted_any {
            return Err(IngestError::unsupported(data_type.as_str()));
        }
        Err(IngestError::AllProvidersFailed(errors))
    }
}
