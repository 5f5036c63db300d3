use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{TemperatureProvider, truncate_body};

const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherMapProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the adapter at a different host, e.g. a local mock server.
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    async fn fetch_current(&self, city: &str) -> Result<f64> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeatherMap")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeatherMap response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeatherMap request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OwmResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeatherMap JSON")?;

        Ok(parsed.main.temp)
    }
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
}

#[async_trait]
impl TemperatureProvider for OpenWeatherMapProvider {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    async fn temperature(&self, city: &str) -> Result<f64> {
        let temperature = self.fetch_current(city).await?;
        info!(provider = self.name(), city, temperature, "reading received");
        Ok(temperature)
    }
}
