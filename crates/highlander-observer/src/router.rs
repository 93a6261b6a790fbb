//! Axum router construction for the operator API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/immortals` -- population snapshot
/// - `POST /api/operator/{start,pause,resume,stop,remove-dead}` -- control
/// - `GET /api/operator/{check,report,status}` -- audits and status
///
/// CORS allows any origin so a local dashboard can call the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/immortals", get(handlers::list_immortals))
        // Operator control
        .route("/api/operator/start", post(operator::start))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/stop", post(operator::stop))
        .route("/api/operator/remove-dead", post(operator::remove_dead))
        // Operator reads
        .route("/api/operator/check", get(operator::check))
        .route("/api/operator/report", get(operator::report))
        .route("/api/operator/status", get(operator::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
