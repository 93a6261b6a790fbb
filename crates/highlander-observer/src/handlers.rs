//! Read-only REST handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Minimal HTML status page linking the operator endpoints.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let summary = match state.current().await {
        Some(manager) => format!(
            "<p>Run <code>{}</code>: {} immortals, {} strategy, {} fights, {}</p>",
            manager.run_id(),
            manager.params().count,
            manager.params().strategy,
            manager.score_board_total(),
            if manager.is_stopped() {
                "stopped"
            } else if manager.is_paused() {
                "paused"
            } else {
                "running"
            }
        ),
        None => "<p>No simulation started.</p>".to_owned(),
    };

    Html(format!(
        "<!doctype html>\n<html><head><title>Highlander</title></head><body>\n\
         <h1>Highlander Simulator</h1>\n{summary}\n<ul>\n\
         <li><code>POST /api/operator/start</code></li>\n\
         <li><code>POST /api/operator/pause</code> / <code>resume</code> / <code>stop</code></li>\n\
         <li><code>POST /api/operator/remove-dead</code></li>\n\
         <li><a href=\"/api/operator/check\">/api/operator/check</a></li>\n\
         <li><a href=\"/api/operator/report\">/api/operator/report</a></li>\n\
         <li><a href=\"/api/operator/status\">/api/operator/status</a></li>\n\
         <li><a href=\"/api/immortals\">/api/immortals</a></li>\n\
         </ul></body></html>\n"
    ))
}

// ---------------------------------------------------------------------------
// GET /api/immortals
// ---------------------------------------------------------------------------

/// Snapshot of every immortal in population order.
///
/// Does not pause the run, so values taken while workers are fighting are
/// not a consistent cut. Fails with 503 when health locks stay held past
/// the report timeout.
pub async fn list_immortals(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let manager = state.current().await.ok_or(ObserverError::NotRunning)?;
    let timeout = state.operator.report_timeout();
    let snapshot = tokio::time::timeout(timeout, manager.population_snapshot())
        .await
        .map_err(|elapsed| {
            ObserverError::LocksUnavailable(format!(
                "could not read immortal health within {}ms ({elapsed})",
                timeout.as_millis()
            ))
        })?;
    Ok(Json(snapshot))
}
