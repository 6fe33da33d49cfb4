#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod builder;
mod client;
mod health;
mod rate_limit;

pub use crate::builder::ProviderClientBuilder;
pub use crate::client::{RateLimitedProviderClient, normalize};
pub use crate::health::HealthTracker;
pub use crate::rate_limit::SlidingWindowLimiter;
