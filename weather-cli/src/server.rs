//! HTTP surface for the aggregator.
//!
//! `GET /weather/{city}` answers with a JSON [`TemperatureReport`] or a 500
//! carrying the aggregation error text.

use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::{info, warn};
use weather_core::{MultiProvider, TemperatureReport};

pub type AppState = Arc<MultiProvider>;

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/weather/:city", get(weather))
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// GET /hello
async fn hello() -> &'static str {
    "hello!"
}

/// GET /weather/:city
async fn weather(
    State(aggregator): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<TemperatureReport>, (StatusCode, String)> {
    let start = Instant::now();

    match aggregator.temperature(&city).await {
        Ok(temperature) => {
            let report = TemperatureReport::new(city, temperature, start.elapsed());
            info!(city = %report.name, temperature, took = %report.took, "served");
            Ok(Json(report))
        }
        Err(e) => {
            warn!(%city, error = %e, "aggregation failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header};
    use std::time::Duration;
    use tower::ServiceExt;
    use weather_core::{SharedProvider, TemperatureProvider};

    #[derive(Debug)]
    struct FixedProvider(Result<f64, &'static str>);

    #[async_trait]
    impl TemperatureProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn temperature(&self, _city: &str) -> anyhow::Result<f64> {
            self.0.map_err(|msg| anyhow::anyhow!(msg))
        }
    }

    fn state(outcomes: &[Result<f64, &'static str>]) -> AppState {
        let providers: Vec<SharedProvider> =
            outcomes.iter().map(|o| Arc::new(FixedProvider(*o)) as SharedProvider).collect();
        Arc::new(MultiProvider::new(providers, Duration::from_millis(300)).unwrap())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, content_type, body.to_vec())
    }

    #[tokio::test]
    async fn hello_endpoint() {
        let (status, _, body) = get(build_router(state(&[Ok(1.0)])), "/hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"hello!");
    }

    #[tokio::test]
    async fn weather_returns_averaged_report() {
        let app = build_router(state(&[Ok(300.0), Ok(310.0)]));
        let (status, content_type, body) = get(app, "/weather/Amsterdam").await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("application/json"));

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "Amsterdam");
        assert_eq!(json["temperature"], 305.0);
        assert!(json["took"].is_string());
    }

    #[tokio::test]
    async fn weather_maps_provider_error_to_500() {
        let app = build_router(state(&[Ok(20.0), Err("invalid api key")]));
        let (status, _, body) = get(app, "/weather/Berlin").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(String::from_utf8(body).unwrap(), "invalid api key");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _, _) = get(build_router(state(&[Ok(1.0)])), "/weather").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
