//! Cognito Auth Bridge
//!
//! Single-binary service that:
//! 1. Accepts a JSON body with username/password or a refresh token
//! 2. Calls Cognito `AdminInitiateAuth` with the matching auth flow
//! 3. Returns the issued tokens as JSON
//!
//! Runs as a Lambda custom runtime (`PLATFORM=lambda`) or a standalone HTTP
//! server (`PLATFORM=http`). Without a platform it logs and exits.

mod config;
mod credentials;
mod error;
mod handler;
mod lambda;
mod metrics;
mod provider_impl;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Platform};
use crate::handler::{AuthHandler, ErrorKind, HandlerResponse};
use crate::lambda::LambdaRuntime;
use crate::provider_impl::CognitoProvider;

/// Time allowed for in-flight requests after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    handler: Arc<AuthHandler>,
    prometheus: PrometheusHandle,
    started_at: Instant,
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` bounds concurrently handled requests.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", post(auth_route))
        .route("/auth", post(auth_route))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting cognito-auth-bridge");

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file, using environment only"),
    }

    let loaded = Config::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config from environment".to_string(),
    });
    let env_platform = std::env::var("PLATFORM").ok();

    let Some((platform, config)) = select_platform(env_platform.as_deref(), loaded)? else {
        return Ok(());
    };

    match platform {
        Platform::Lambda => run_lambda(config).await,
        Platform::Http => run_http(config).await,
    }
}

/// Pick the platform to run, or `None` when there is nothing to run.
///
/// A config that failed to load is only fatal when `PLATFORM` names a known
/// platform; otherwise the process logs "no platform defined" and exits.
fn select_platform(
    env_platform: Option<&str>,
    loaded: Result<Config>,
) -> Result<Option<(Platform, Config)>> {
    let config = match loaded {
        Ok(config) => config,
        Err(e) if env_platform.and_then(Platform::from_name).is_some() => return Err(e),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "ignoring configuration error");
            info!(platform = ?env_platform, "no platform defined");
            return Ok(None);
        }
    };

    match config.platform() {
        Some(platform) => Ok(Some((platform, config))),
        None => {
            info!(platform = ?config.platform, "no platform defined");
            Ok(None)
        }
    }
}

/// Validate configuration and wire the Cognito provider into a handler.
fn build_handler(config: &Config) -> Result<AuthHandler> {
    config.validate().context("invalid configuration")?;

    let provider =
        CognitoProvider::from_config(config).context("failed to build Cognito client")?;

    info!(
        client_id = %config.tenant.client_id,
        pool_id = %config.tenant.pool_id,
        reject_missing_credentials = config.handler.reject_missing_credentials,
        "configuration loaded"
    );

    Ok(AuthHandler::new(
        Arc::new(provider),
        Arc::new(config.tenant.clone()),
        config.handler.reject_missing_credentials,
    ))
}

async fn run_lambda(config: Config) -> Result<()> {
    let runtime = LambdaRuntime::from_env().context("not running inside Lambda")?;

    let handler = match build_handler(&config) {
        Ok(handler) => handler,
        Err(e) => {
            let message = format!("{e:#}");
            if let Err(report_err) = runtime.send_init_error("Runtime.InitError", &message).await {
                warn!(error = %report_err, "failed to report init error");
            }
            return Err(e);
        }
    };

    // Recorded but not exposed; Lambda has no scrape endpoint
    let _prometheus = metrics::install_recorder();

    runtime.run(&handler).await.context("Lambda runtime failed")
}

async fn run_http(config: Config) -> Result<()> {
    let handler = build_handler(&config)?;

    let prometheus = metrics::install_recorder();

    let state = AppState {
        handler: Arc::new(handler),
        prometheus,
        started_at: Instant::now(),
    };

    let app = build_router(state, config.http.max_connections);

    let listen_addr = config.http.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, so the server
    // is told to drain first and then raced against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: process liveness plus which provider is wired in.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "provider": state.handler.provider_id(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });
    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Authenticate the posted credentials.
async fn auth_route(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "failed to read request body");
            return HandlerResponse::error(
                ErrorKind::InvalidRequest,
                &format!("invalid request body: {e}"),
                &request_id,
                None,
            )
            .into_response();
        }
    };

    let mut response = state.handler.handle(&body, &request_id).await.into_response();
    if let Ok(value) = axum::http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
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
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
