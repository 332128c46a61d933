//! Gateway HTTP server: LINE webhook callback and health probe.

use crate::channels::{LineWebhook, SIGNATURE_HEADER};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::publish::{self, Publisher};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// Shared, read-only state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub webhook: Arc<LineWebhook>,
    pub dispatcher: Dispatcher,
    /// Port reported by the health probe.
    pub port: u16,
}

impl GatewayState {
    /// Build handler state from resolved config (env overrides already applied).
    pub fn from_config(config: &Config, publisher: Arc<dyn Publisher>) -> Result<Self> {
        let secret = config
            .line
            .channel_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("line.channelSecret (or CHANNEL_SECRET) is not set"))?;
        let dispatcher = Dispatcher::from_config(&config.routing, publisher)?;
        log::info!(
            "routing {} command(s) with prefix {:?}; fallback topic {}",
            dispatcher.table().route_count(),
            dispatcher.prefix(),
            dispatcher.table().fallback()
        );
        Ok(Self {
            webhook: Arc::new(LineWebhook::new(secret)),
            dispatcher,
            port: config.gateway.port,
        })
    }
}

/// Router with all gateway routes.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/line/webhook", post(line_webhook))
        .route("/callback", post(line_webhook))
        .with_state(state)
}

/// Run the gateway until SIGINT/SIGTERM. `config` must already have env overrides applied.
pub async fn run_gateway(config: Config) -> Result<()> {
    let publisher = publish::publisher_from_config(&config)?;
    run_gateway_with_publisher(config, publisher, shutdown_signal()).await
}

/// Run the gateway with an explicit publisher until `shutdown` completes.
pub async fn run_gateway_with_publisher(
    config: Config,
    publisher: Arc<dyn Publisher>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let state = GatewayState::from_config(&config, publisher)?;
    let app = build_router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// JSON-typed response; an empty body on success, `{"message": ...}` on failure.
fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn error_response(message: String) -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": message }).to_string(),
    )
}

/// POST /line/webhook — verify signature, decode events, dispatch them to topics.
async fn line_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    log::debug!(
        "line callback started, headers: {:?}, body: {} bytes",
        headers.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
        body.len()
    );
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let events = match state.webhook.decode(signature, &body) {
        Ok(events) => events,
        Err(e) => {
            log::warn!("error occurred while parsing request: {}", e);
            return error_response(e.to_string());
        }
    };
    if let Err(e) = state.dispatcher.dispatch(&events).await {
        log::warn!("error occurred while dispatching request: {}", e);
        return error_response(e.to_string());
    }
    json_response(StatusCode::OK, String::new())
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
