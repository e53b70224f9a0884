//! HTTP server lifecycle and router construction.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

use super::v0;
use crate::{api_client::types::DriverInfo, service::VoltageService};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind the API server to. Defaults to "127.0.0.1:8821".
    pub bind_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8821".to_string(),
        }
    }
}

/// Shared application state available to all handlers.
#[derive(Clone)]
pub(crate) struct SharedState {
    pub service: Arc<VoltageService>,
    pub info: DriverInfo,
}

/// Start the API server.
///
/// Runs until the cancellation token is triggered. Requests in flight when
/// shutdown begins are allowed to finish, so a set is never cut off
/// between its write and read-back.
pub async fn serve(
    config: ApiConfig,
    shutdown: CancellationToken,
    service: Arc<VoltageService>,
    info: DriverInfo,
) -> Result<()> {
    let app = build_router(service, info);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {}", config.bind_addr))?;
    let actual_addr = listener.local_addr()?;

    info!(url = %format!("http://{}", actual_addr), "API server listening.");

    if !actual_addr.ip().is_loopback() {
        warn!(
            "API server is bound to a non-localhost address ({}). \
             Anyone on the network can change rail voltages.",
            actual_addr.ip()
        );
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await?;

    Ok(())
}

/// Build the application router with all API routes.
pub(crate) fn build_router(service: Arc<VoltageService>, info: DriverInfo) -> Router {
    let state = SharedState { service, info };

    Router::new()
        .nest("/api/v0", v0::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
