//! Fan-out/fan-in temperature aggregation.
//!
//! Every provider is queried on its own detached task. The caller's loop
//! consumes outcomes in arrival order against a single deadline and fails on
//! the first error or on expiry. Tasks still running when the call returns
//! are left to finish on their own; their results are dropped.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    error::AggregateError,
    provider::{SharedProvider, TemperatureProvider},
};

/// Deadline applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300);

/// Averages readings from a fixed, non-empty set of providers.
#[derive(Debug, Clone)]
pub struct MultiProvider {
    providers: Arc<[SharedProvider]>,
    timeout: Duration,
}

impl MultiProvider {
    /// Fails with [`AggregateError::NoProviders`] when `providers` is empty.
    pub fn new(providers: Vec<SharedProvider>, timeout: Duration) -> Result<Self, AggregateError> {
        if providers.is_empty() {
            return Err(AggregateError::NoProviders);
        }
        Ok(Self { providers: providers.into(), timeout })
    }

    /// Number of queries issued per call, repeats included. Never zero.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Mean temperature across all providers, or the first failure.
    ///
    /// Succeeds only if every provider answers successfully before the
    /// deadline, which starts when the queries are dispatched. When several
    /// events are ready at once, expiry beats an error and an error beats a
    /// success.
    #[tracing::instrument(skip(self), fields(providers = self.providers.len()))]
    pub async fn temperature(&self, city: &str) -> Result<f64, AggregateError> {
        let n = self.providers.len();
        let (ok_tx, mut ok_rx) = mpsc::channel::<f64>(n);
        let (err_tx, mut err_rx) = mpsc::channel::<AggregateError>(n);

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        for provider in self.providers.iter() {
            let provider = Arc::clone(provider);
            let city = city.to_owned();
            let ok_tx = ok_tx.clone();
            let err_tx = err_tx.clone();

            // Detached: the handle is dropped and the task is never aborted.
            tokio::spawn(async move {
                let name = provider.name();
                match provider.temperature(&city).await {
                    Ok(t) => {
                        debug!(provider = name, temperature = t, "provider answered");
                        let _ = ok_tx.send(t).await;
                    }
                    Err(e) => {
                        debug!(provider = name, error = %format_args!("{e:#}"), "provider failed");
                        let _ = err_tx.send(AggregateError::provider(name, e)).await;
                    }
                }
            });
        }
        drop(ok_tx);
        drop(err_tx);

        let mut sum = 0.0;
        for _ in 0..n {
            tokio::select! {
                biased;

                () = &mut deadline => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "providers timed out");
                    return Err(AggregateError::Timeout { after: self.timeout });
                }
                Some(err) = err_rx.recv() => {
                    if let AggregateError::Provider { provider, .. } = &err {
                        warn!(provider, error = %err, "aborting aggregation on provider error");
                    }
                    return Err(err);
                }
                Some(t) = ok_rx.recv() => {
                    sum += t;
                }
            }
        }

        Ok(sum / n as f64)
    }
}

#[async_trait]
impl TemperatureProvider for MultiProvider {
    fn name(&self) -> &'static str {
        "multi"
    }

    async fn temperature(&self, city: &str) -> anyhow::Result<f64> {
        Ok(MultiProvider::temperature(self, city).await?)
    }
}
