//! HTTP Server and Startup Phases
//!
//! This module implements the exporter's HTTP surface and the phases that run before
//! it starts serving.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET {metrics_path}?target=<name>` - Scrapes one Kibana target and returns its
//!   metrics in the Prometheus text format. Without `target` the first configured
//!   target is used; an unknown name answers `404`.
//! - `GET /health` - 200 if the default target answered its latest fetch, 503 otherwise
//!
//! # Collection
//!
//! There is no background loop: every request to the metrics path triggers exactly
//! one upstream fetch through [`ExportCoordinator::snapshot`]. Requests are
//! serialized by the coordinator.

use crate::config::ServerConfig;
use crate::exporter::ExportCoordinator;
use crate::kibana::StatusCollector;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Content type of the Prometheus text exposition format
const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
struct AppState {
    coordinator: Arc<ExportCoordinator>,
    metrics_path: String,
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    target: Option<String>,
}

/// Resolve the `target` query parameter. Empty or absent means the default target.
pub fn resolve_target<'a>(
    coordinator: &'a ExportCoordinator,
    name: Option<&str>,
) -> Option<&'a StatusCollector> {
    match name.map(str::trim) {
        None | Some("") => Some(coordinator.default_target()),
        Some(name) => coordinator.select_target(name),
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Build the exporter's router
pub fn router(coordinator: Arc<ExportCoordinator>, config: &ServerConfig) -> Router {
    let metrics_path = normalize_path(&config.metrics_path);
    let state = AppState {
        coordinator,
        metrics_path: metrics_path.clone(),
    };

    Router::new()
        .route("/", get(root_handler))
        .route(&metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn start(config: ServerConfig, coordinator: Arc<ExportCoordinator>) -> anyhow::Result<()> {
    let app = router(coordinator, &config);

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;

    info!("Metrics server listening on {}", config.listen_address);
    info!(
        "Metrics available at http://{}{}",
        config.listen_address,
        normalize_path(&config.metrics_path)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Metrics server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Readiness phase run before serving.
///
/// Targets with the wait flag are probed until they answer, every `delay`, for at most
/// `max_attempts` probes (`None` = forever). Running out of attempts is fatal. Other
/// targets are probed once and only logged when unreachable.
pub async fn wait_for_targets(
    coordinator: &ExportCoordinator,
    delay: Duration,
    max_attempts: Option<u32>,
) -> anyhow::Result<()> {
    for collector in coordinator.collectors() {
        if collector.profile().wait() {
            info!("Waiting for Kibana '{}' before serving", collector.name());
            if !collector.wait_until_ready_with(delay, max_attempts).await {
                anyhow::bail!(
                    "Kibana '{}' did not become ready in time",
                    collector.name()
                );
            }
        } else if !collector.test_connection().await {
            warn!(
                "Kibana '{}' is not responsive, not waiting for it",
                collector.name()
            );
        }
    }
    Ok(())
}

/// One-shot diagnostic run: scrape the default target once and return the rendered
/// exposition.
pub async fn dry_run(coordinator: &ExportCoordinator) -> anyhow::Result<String> {
    let snapshot = coordinator.snapshot(coordinator.default_target()).await;
    snapshot.render()
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(format!(
        r#"<html>
<head><title>Kibana Exporter</title></head>
<body>
<h1>Kibana Exporter</h1>
<p><a href="{}">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
        state.metrics_path
    ))
}

async fn metrics_handler(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    let Some(collector) = resolve_target(&state.coordinator, params.target.as_deref()) else {
        let name = params.target.unwrap_or_default();
        warn!("Scrape requested for unknown target '{}'", name);
        return (
            StatusCode::NOT_FOUND,
            format!("Unknown Kibana target: {}", name),
        )
            .into_response();
    };

    let snapshot = state.coordinator.snapshot(collector).await;
    match snapshot.render() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.coordinator.default_target().state() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Kibana unreachable")
    }
}
