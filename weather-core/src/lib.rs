//! Core library for the `weather` temperature aggregator.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The provider capability and its OpenWeatherMap / Weatherstack adapters
//! - The fan-out aggregator that averages providers under a deadline
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;

pub use aggregator::{DEFAULT_TIMEOUT, MultiProvider};
pub use config::{Config, ProviderConfig};
pub use error::AggregateError;
pub use model::TemperatureReport;
pub use provider::{ProviderId, SharedProvider, TemperatureProvider, providers_from_config};

/// Build the aggregator described by `config`.
pub fn aggregator_from_config(config: &Config) -> anyhow::Result<MultiProvider> {
    let providers = providers_from_config(config)?;
    Ok(MultiProvider::new(providers, config.timeout())?)
}
