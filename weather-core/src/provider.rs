use crate::{
    Config,
    provider::{openweathermap::OpenWeatherMapProvider, weatherstack::WeatherStackProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openweathermap;
pub mod weatherstack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeatherMap,
    WeatherStack,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::WeatherStack => "weatherstack",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::WeatherStack, ProviderId::OpenWeatherMap]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            "weatherstack" => Ok(ProviderId::WeatherStack),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweathermap, weatherstack."
            )),
        }
    }
}

/// A source of current temperature readings, in degrees Celsius.
///
/// Implementations pass the city through to their backing service verbatim
/// and neither retry nor apply their own timeout.
#[async_trait]
pub trait TemperatureProvider: Send + Sync + Debug {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn temperature(&self, city: &str) -> anyhow::Result<f64>;
}

/// Shared handle to a provider, as held by the aggregator.
pub type SharedProvider = Arc<dyn TemperatureProvider>;

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(id: ProviderId, config: &Config) -> anyhow::Result<SharedProvider> {
    let api_key = config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather configure {id}` and enter your API key."
        )
    })?;

    let shared: SharedProvider = match id {
        ProviderId::OpenWeatherMap => Arc::new(OpenWeatherMapProvider::new(api_key.to_owned())),
        ProviderId::WeatherStack => Arc::new(WeatherStackProvider::new(api_key.to_owned())),
    };

    Ok(shared)
}

/// Build the full provider set: every configured provider, each repeated
/// `repeat` times. Repeats share one adapter instance.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Vec<SharedProvider>> {
    let mut providers = Vec::new();

    for &id in ProviderId::all() {
        let Some(entry) = config.provider_config(id) else {
            continue;
        };
        if entry.repeat == 0 {
            continue;
        }

        let provider = provider_from_config(id, config)?;
        providers.extend(std::iter::repeat_n(provider, entry.repeat));
    }

    if providers.is_empty() {
        return Err(anyhow::anyhow!(
            "No providers configured.\n\
             Hint: run `weather configure <provider>` (e.g. `weather configure weatherstack`) first."
        ));
    }

    Ok(providers)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
