use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password};
use tracing::info;
use weather_core::{Config, ProviderId, TemperatureReport, aggregator_from_config};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Average temperature across weather providers")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweathermap" or "weatherstack".
        provider: String,
    },

    /// Show the averaged temperature for a city.
    Show {
        /// City name, passed to every provider as is.
        city: String,

        /// Override the configured deadline.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve `/weather/{city}` over HTTP.
    Serve {
        /// Address to bind, e.g. "127.0.0.1:8080".
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Override the configured deadline.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = self.load_config()?;

        match self.command {
            Command::Configure { ref provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                configure(&mut config, id)?;
                self.save_config(&config)?;
                println!("Provider '{id}' configured.");
            }
            Command::Show { ref city, timeout_ms, json } => {
                if let Some(ms) = timeout_ms {
                    config.timeout_ms = ms;
                }
                let aggregator = aggregator_from_config(&config)?;

                let start = Instant::now();
                let temperature = aggregator.temperature(city).await?;
                let report = TemperatureReport::new(city.as_str(), temperature, start.elapsed());

                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{}: {:.2} °C (took {})", report.name, report.temperature, report.took);
                }
            }
            Command::Serve { listen, timeout_ms } => {
                if let Some(ms) = timeout_ms {
                    config.timeout_ms = ms;
                }
                let addr = match listen {
                    Some(addr) => addr,
                    None => config
                        .listen
                        .parse()
                        .with_context(|| format!("Invalid listen address '{}'", config.listen))?,
                };
                let aggregator = aggregator_from_config(&config)?;
                info!(
                    providers = aggregator.provider_count(),
                    timeout = ?aggregator.timeout(),
                    "aggregator ready"
                );
                server::serve(addr, Arc::new(aggregator)).await?;
            }
        }

        Ok(())
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    fn save_config(&self, config: &Config) -> anyhow::Result<()> {
        match &self.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
    }
}

/// Prompt for the provider's API key and repeat count.
fn configure(config: &mut Config, id: ProviderId) -> anyhow::Result<()> {
    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let current = config.provider_config(id).map_or(1, |p| p.repeat);
    let repeat = CustomType::<usize>::new("How many times should this provider be queried?")
        .with_default(current)
        .with_help_message("0 keeps the key but leaves the provider out of the average")
        .prompt()
        .context("Failed to read repeat count")?;

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.set_repeat(id, repeat);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_overrides() {
        let cli = Cli::parse_from(["weather", "show", "Sydney", "--timeout-ms", "500", "--json"]);
        match cli.command {
            Command::Show { city, timeout_ms, json } => {
                assert_eq!(city, "Sydney");
                assert_eq!(timeout_ms, Some(500));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_serve_with_global_config() {
        let cli = Cli::parse_from([
            "weather",
            "serve",
            "--listen",
            "127.0.0.1:9000",
            "--config",
            "/tmp/weather.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/weather.toml")));
        match cli.command {
            Command::Serve { listen, timeout_ms } => {
                assert_eq!(listen, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(timeout_ms, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_listen_address() {
        assert!(Cli::try_parse_from(["weather", "serve", "--listen", "nowhere"]).is_err());
    }
}
