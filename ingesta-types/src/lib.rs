//! Shared data transfer objects for the ingesta workspace: data types and
//! refresh modes, configuration, refresh results, dead-letter records, gate
//! outcomes and the [`IngestError`] taxonomy.
#![warn(missing_docs)]

mod config;
mod data_type;
mod dead_letter;
mod error;
mod gate;
mod provider;
mod results;

pub use config::{
    GateConfig, HealthConfig, IngestionRequirement, ProviderSettings, RateLimitConfig,
    RefreshConfig, RetryConfig,
};
pub use data_type::{DataType, RefreshMode, Stage};
pub use dead_letter::{DeadLetterEntry, DeadLetterFilter, DeadLetterKey};
pub use error::IngestError;
pub use gate::{GateResult, GateState};
pub use provider::{ProviderHealth, ProviderKey, ProviderRecord};
pub use results::{
    BatchResult, DataTypeRefreshResult, RefreshRequest, RefreshStatus, RefreshTotals,
    SymbolRefreshResult,
};
