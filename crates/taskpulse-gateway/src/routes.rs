//! Route handlers for the gateway.

use std::sync::Arc;

use axum::{Json, extract::State};
use taskpulse_board::BoardApi;

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "taskpulse-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Read-only listing of the local mirror.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.store.list_all() {
        Ok(tasks) => Json(serde_json::json!({ "ok": true, "tasks": tasks })),
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
    }
}

/// The board probes its callback URL with HEAD when a webhook is created.
/// Acknowledge without side effects.
pub async fn webhook_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Webhook registered!" }))
}

/// Inbound board event: make sure our webhook registration exists, then
/// kick off a sync out of band. The response is a trigger acknowledgement,
/// never the reconcile result.
pub async fn webhook_trigger(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    if let Err(e) = ensure_webhook(state.board.as_ref(), &state.config.callback_url).await {
        tracing::warn!("Webhook registration check failed: {e}");
    }

    let reconciler = state.reconciler.clone();
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        match reconciler.run().await {
            Ok(outcome) => tracing::info!(
                "Webhook sync: {} created, {} updated, {} deleted",
                outcome.created,
                outcome.updated,
                outcome.deleted
            ),
            Err(e) => {
                tracing::error!("Webhook sync failed: {e}");
                return;
            }
        }
        // Webhook path runs the assignment and completion scans right
        // away; overdue and escalation stay on their schedule.
        if let Err(e) = dispatcher.scan_assignments().await {
            tracing::warn!("Assignment scan failed: {e}");
        }
        if let Err(e) = dispatcher.scan_completions().await {
            tracing::warn!("Completion scan failed: {e}");
        }
    });

    Json(serde_json::json!({ "message": "Board sync triggered!" }))
}

/// Create the webhook registration if no existing one points at our
/// callback URL.
pub async fn ensure_webhook(
    board: &dyn BoardApi,
    callback_url: &str,
) -> taskpulse_core::error::Result<()> {
    if callback_url.is_empty() {
        return Ok(());
    }
    let existing = board.list_webhooks().await?;
    if existing.iter().any(|wh| wh.callback_url == callback_url) {
        return Ok(());
    }
    board.create_webhook(callback_url).await
}
