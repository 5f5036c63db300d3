use std::time::Duration;

use thiserror::Error;

/// Failure of a single aggregated temperature query.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The aggregator was built without any providers.
    #[error("no temperature providers configured")]
    NoProviders,

    /// Not every provider answered before the deadline.
    #[error("api time out after {after:?}")]
    Timeout { after: Duration },

    /// The first provider error observed; the message is the provider's own
    /// full context chain.
    #[error("{source:#}")]
    Provider {
        /// Provider label, kept for logging only.
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AggregateError {
    pub fn provider(provider: &'static str, source: anyhow::Error) -> Self {
        Self::Provider { provider, source }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
