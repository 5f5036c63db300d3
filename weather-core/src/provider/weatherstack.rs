use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{TemperatureProvider, truncate_body};

const DEFAULT_BASE_URL: &str = "http://api.weatherstack.com";

#[derive(Debug, Clone)]
pub struct WeatherStackProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherStackProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), http: Client::new() }
    }

    async fn fetch_current(&self, city: &str) -> Result<f64> {
        let url = format!("{}/current", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("access_key", self.api_key.as_str()), ("query", city), ("units", "m")])
            .send()
            .await
            .context("Failed to send request to Weatherstack")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Weatherstack response body")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Weatherstack request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        // Weatherstack answers API-level failures with 200 and an error object.
        let parsed: WsResponse =
            serde_json::from_str(&body).context("Failed to parse Weatherstack JSON")?;

        match parsed {
            WsResponse::Failure { error } => Err(anyhow::anyhow!(
                "Weatherstack error {} ({}): {}",
                error.code,
                error.kind,
                error.info
            )),
            WsResponse::Current { current } => Ok(current.temperature),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WsCurrent {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct WsError {
    code: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WsResponse {
    Failure {
        error: WsError,
    },
    Current {
        current: WsCurrent,
    },
}

#[async_trait]
impl TemperatureProvider for WeatherStackProvider {
    fn name(&self) -> &'static str {
        "weatherstack"
    }

    async fn temperature(&self, city: &str) -> Result<f64> {
        let temperature = self.fetch_current(city).await?;
        info!(provider = self.name(), city, temperature, "reading received");
        Ok(temperature)
    }
}
