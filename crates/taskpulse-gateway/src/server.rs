//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use taskpulse_board::BoardApi;
use taskpulse_core::config::GatewayConfig;
use taskpulse_core::error::{Error, Result};
use taskpulse_engine::{Dispatcher, Reconciler};
use taskpulse_store::MirrorDb;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub board: Arc<dyn BoardApi>,
    pub store: Arc<MirrorDb>,
    pub reconciler: Arc<Reconciler>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/tasks", get(super::routes::list_tasks))
        .route(
            "/webhook/board",
            post(super::routes::webhook_trigger).head(super::routes::webhook_probe),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Gateway(format!("Bind {addr}: {e}")))?;
    tracing::info!("Gateway listening on {addr}");
    axum::serve(listener, router)
        .await
        .map_err(|e| Error::Gateway(format!("Serve: {e}")))
}
