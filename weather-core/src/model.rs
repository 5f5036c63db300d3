use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Aggregated reading returned to callers of the HTTP API and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReport {
    pub name: String,
    /// Mean across all providers, in degrees Celsius.
    pub temperature: f64,
    /// Wall time spent on the query, e.g. `"12.4ms"`.
    pub took: String,
}

impl TemperatureReport {
    pub fn new(name: impl Into<String>, temperature: f64, took: Duration) -> Self {
        Self { name: name.into(), temperature, took: format!("{took:?}") }
    }
}
