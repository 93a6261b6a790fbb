//! Operator REST API handlers for simulation control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/start` | Start a run, replacing any previous one |
//! | `POST` | `/api/operator/pause` | Close the pause gate |
//! | `POST` | `/api/operator/resume` | Open the pause gate |
//! | `POST` | `/api/operator/stop` | Stop the current run |
//! | `POST` | `/api/operator/remove-dead` | Pause, settle, remove dead immortals (`?format=text` for the text frame) |
//! | `GET` | `/api/operator/check` | Pause, settle, audit total health (JSON) |
//! | `GET` | `/api/operator/report` | Same as check, as plain text |
//! | `GET` | `/api/operator/status` | Current simulation status |
//!
//! Check, report, and remove-dead leave the simulation paused.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::time::error::Elapsed;
use tracing::info;

use highlander_core::{SimulationManager, WorkerSummary, audit_population};
use highlander_types::{FightStrategy, ImmortalSnapshot, RunId, SimulationParams};

use crate::error::ObserverError;
use crate::report::{CheckReport, RemoveDeadReport, render_check, render_remove_dead};
use crate::state::AppState;

/// Largest population the API will start.
pub const MAX_COUNT: usize = 20_000;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/start`. Missing fields use the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Number of immortals.
    pub count: Option<usize>,
    /// `ordered` or `naive`, case-insensitive.
    pub strategy: Option<String>,
    /// Starting health of every immortal.
    pub initial_health: Option<i64>,
    /// Damage per landed hit.
    pub damage: Option<i64>,
}

impl StartRequest {
    fn into_params(self, defaults: SimulationParams) -> Result<SimulationParams, ObserverError> {
        let strategy = match self.strategy {
            Some(raw) => raw
                .parse::<FightStrategy>()
                .map_err(|e| ObserverError::InvalidRequest(e.to_string()))?,
            None => defaults.strategy,
        };
        let params = SimulationParams {
            count: self.count.unwrap_or(defaults.count),
            strategy,
            initial_health: self.initial_health.unwrap_or(defaults.initial_health),
            damage: self.damage.unwrap_or(defaults.damage),
        };
        if params.count > MAX_COUNT {
            return Err(ObserverError::InvalidRequest(format!(
                "count must be at most {MAX_COUNT}, got {}",
                params.count
            )));
        }
        Ok(params)
    }
}

/// Generic success response.
#[derive(Debug, Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

/// Response for `POST /api/operator/start`.
#[derive(Debug, Serialize)]
struct StartResponse {
    ok: bool,
    run_id: RunId,
    params: SimulationParams,
}

/// Response for `POST /api/operator/stop`.
#[derive(Debug, Serialize)]
struct StopResponse {
    ok: bool,
    message: String,
    total_fights: u64,
    finished: Vec<WorkerSummaryBody>,
    stalled: usize,
}

#[derive(Debug, Serialize)]
struct WorkerSummaryBody {
    name: String,
    fights_landed: u64,
    idle_iterations: u64,
}

impl From<WorkerSummary> for WorkerSummaryBody {
    fn from(summary: WorkerSummary) -> Self {
        Self {
            name: summary.name.to_string(),
            fights_landed: summary.fights_landed,
            idle_iterations: summary.idle_iterations,
        }
    }
}

async fn require_simulation(state: &AppState) -> Result<Arc<SimulationManager>, ObserverError> {
    state.current().await.ok_or(ObserverError::NotRunning)
}

// ---------------------------------------------------------------------------
// POST /api/operator/start
// ---------------------------------------------------------------------------

/// Start a new run. Any previous run is stopped first.
///
/// An empty body starts a run with the configured defaults.
pub async fn start(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ObserverError> {
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ObserverError::InvalidRequest(format!("malformed start request: {e}")))?
    };
    let params = request.into_params(state.defaults)?;

    let manager = state.restart(params).await?;

    Ok(Json(StartResponse {
        ok: true,
        run_id: manager.run_id(),
        params,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the simulation. Idempotent.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let manager = require_simulation(&state).await?;
    manager.pause();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Simulation paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the simulation after a pause. Idempotent.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let manager = require_simulation(&state).await?;
    manager.resume();

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Simulation resumed".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Stop the current run.
///
/// Workers stuck in a lock cycle are reported as `stalled` and left
/// detached. A second stop returns an empty report.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let manager = require_simulation(&state).await?;
    let report = manager.stop(state.operator.stop_grace()).await;

    let message = if !report.first_stop {
        "Simulation already stopped".to_owned()
    } else if report.stalled > 0 {
        format!("Simulation stopped; {} workers stalled", report.stalled)
    } else {
        "Simulation stopped".to_owned()
    };

    Ok(Json(StopResponse {
        ok: true,
        message,
        total_fights: manager.score_board_total(),
        finished: report.finished.into_iter().map(Into::into).collect(),
        stalled: report.stalled,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/remove-dead
// ---------------------------------------------------------------------------

async fn remove_dead_report(state: &AppState) -> Result<RemoveDeadReport, ObserverError> {
    let manager = require_simulation(state).await?;
    manager.pause();
    let settled = manager.quiesce(state.operator.settle_timeout()).await;

    // Removal reads every health lock before it touches the list, so a
    // timeout here leaves the population unchanged.
    let timeout = state.operator.report_timeout();
    let removal = async {
        let population_before = manager.population_size().await;
        let removed = manager.remove_dead_immortals().await;
        (population_before, removed)
    };
    let (population_before, removed) = tokio::time::timeout(timeout, removal)
        .await
        .map_err(|elapsed| locks_unavailable(timeout, &elapsed))?;

    let population_after = manager.population_size().await;
    let still_alive = tokio::time::timeout(timeout, manager.alive_count()).await.ok();

    Ok(RemoveDeadReport {
        settled,
        population_before,
        removed,
        population_after,
        still_alive,
    })
}

/// Query string for `POST /api/operator/remove-dead`.
#[derive(Debug, Default, Deserialize)]
pub struct RemoveDeadQuery {
    /// `text` renders the operator frame instead of JSON.
    pub format: Option<String>,
}

/// Pause, settle, and remove every dead immortal. Leaves the run paused.
pub async fn remove_dead(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RemoveDeadQuery>,
) -> Result<Response, ObserverError> {
    let report = remove_dead_report(&state).await?;
    info!(removed = report.removed, after = report.population_after, "Remove-dead served");

    if query.format.as_deref() == Some("text") {
        Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], render_remove_dead(&report)).into_response())
    } else {
        Ok(Json(report).into_response())
    }
}

// ---------------------------------------------------------------------------
// GET /api/operator/check, GET /api/operator/report
// ---------------------------------------------------------------------------

/// Pause, settle, snapshot, and audit the current run.
///
/// Settling can time out (a naive lock cycle never parks). The snapshot
/// itself is bounded by the report timeout; past that the health locks are
/// presumed held by deadlocked workers and the request fails with 503.
pub async fn check_report(state: &AppState) -> Result<CheckReport, ObserverError> {
    let manager = require_simulation(state).await?;
    manager.pause();
    let settled = manager.quiesce(state.operator.settle_timeout()).await;

    let timeout = state.operator.report_timeout();
    let snapshot: Vec<ImmortalSnapshot> =
        tokio::time::timeout(timeout, manager.population_snapshot())
            .await
            .map_err(|elapsed| locks_unavailable(timeout, &elapsed))?;

    let audit = audit_population(
        manager.params(),
        &snapshot,
        manager.score_board_total(),
        &state.tolerance,
    );
    let immortals = (snapshot.len() <= state.operator.show_individual_limit).then_some(snapshot);

    Ok(CheckReport {
        settled,
        audit,
        immortals,
    })
}

/// Pause and check the total-health invariant. Leaves the run paused.
pub async fn check(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let report = check_report(&state).await?;
    info!(
        status = ?report.audit.status,
        difference = report.audit.difference,
        settled = report.settled,
        "Invariant check served"
    );
    Ok(Json(report))
}

/// Same as [`check`], rendered as the operator text frame.
pub async fn report(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let report = check_report(&state).await?;
    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], render_check(&report)))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Current simulation status.
///
/// Counting live immortals takes each health lock, so this is bounded by
/// the report timeout as well.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let manager = require_simulation(&state).await?;
    let timeout = state.operator.report_timeout();
    let status = tokio::time::timeout(timeout, manager.status())
        .await
        .map_err(|elapsed| locks_unavailable(timeout, &elapsed))?;
    Ok(Json(status))
}

fn locks_unavailable(timeout: Duration, elapsed: &Elapsed) -> ObserverError {
    ObserverError::LocksUnavailable(format!(
        "could not read immortal health within {}ms ({elapsed}); workers are likely deadlocked",
        timeout.as_millis()
    ))
}
