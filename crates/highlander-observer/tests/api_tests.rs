//! Integration tests for the operator API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Simulations run for real, so every test uses a
//! multi-threaded runtime.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use highlander_core::HighlanderConfig;
use highlander_observer::router::build_router;
use highlander_observer::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn test_config() -> HighlanderConfig {
    let mut config = HighlanderConfig::default();
    config.simulation.count = 4;
    config.operator.settle_timeout_ms = 2_000;
    config.operator.stop_grace_ms = 2_000;
    config.operator.report_timeout_ms = 500;
    config
}

fn app(config: &HighlanderConfig) -> (Arc<AppState>, Router) {
    let state = Arc::new(AppState::new(config));
    let router = build_router(Arc::clone(&state));
    (state, router)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let (_, router) = app(&test_config());
    let response = router.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_to_text(response.into_body()).await;
    assert!(text.contains("Highlander Simulator"));
    assert!(text.contains("No simulation started"));
}

#[tokio::test]
async fn test_controls_without_simulation_conflict() {
    let (_, router) = app(&test_config());

    for request in [
        post("/api/operator/pause", ""),
        post("/api/operator/resume", ""),
        post("/api/operator/stop", ""),
        post("/api/operator/remove-dead", ""),
        get("/api/operator/check"),
        get("/api/operator/status"),
        get("/api/immortals"),
    ] {
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["status"], 409);
        assert!(json["error"].as_str().unwrap().contains("no simulation"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_with_defaults_then_stop() {
    let (state, router) = app(&test_config());

    let response = router
        .clone()
        .oneshot(post("/api/operator/start", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["params"]["count"], 4);
    assert_eq!(json["params"]["strategy"], "ordered");
    assert!(json["run_id"].is_string());

    let response = router.clone().oneshot(get("/api/operator/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["population_size"], 4);
    assert_eq!(json["stopped"], false);

    let response = router
        .clone()
        .oneshot(post("/api/operator/stop", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stalled"], 0);
    assert_eq!(json["finished"].as_array().unwrap().len(), 4);

    let response = router
        .clone()
        .oneshot(post("/api/operator/stop", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["message"], "Simulation already stopped");

    assert!(state.current().await.unwrap().is_stopped());
}

#[tokio::test]
async fn test_start_rejects_bad_requests() {
    let (state, router) = app(&test_config());

    for body in [
        r#"{"strategy": "chaotic"}"#,
        r#"{"count": 1}"#,
        r#"{"count": 30000}"#,
        r#"{"initial_health": 0}"#,
        r#"{"damage": -5}"#,
        "{not json",
    ] {
        let response = router
            .clone()
            .oneshot(post("/api/operator/start", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["status"], 400);
    }
    assert!(state.current().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restart_replaces_previous_run() {
    let (state, router) = app(&test_config());

    let first = router
        .clone()
        .oneshot(post("/api/operator/start", r#"{"count": 3}"#))
        .await
        .unwrap();
    let first = body_to_json(first.into_body()).await;
    let previous = state.current().await.unwrap();

    let second = router
        .clone()
        .oneshot(post("/api/operator/start", r#"{"count": 5, "strategy": "NAIVE"}"#))
        .await
        .unwrap();
    let second = body_to_json(second.into_body()).await;

    assert_ne!(first["run_id"], second["run_id"]);
    assert_eq!(second["params"]["strategy"], "naive");
    assert!(previous.is_stopped());
    assert_eq!(state.current().await.unwrap().population_size().await, 5);

    state.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_check_pauses_and_reports_invariant() {
    let (state, router) = app(&test_config());
    router
        .clone()
        .oneshot(post("/api/operator/start", r#"{"count": 4, "strategy": "ordered"}"#))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = router.clone().oneshot(get("/api/operator/check")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;

    assert_eq!(json["settled"], true);
    assert_eq!(json["audit"]["status"], "ok");
    assert_eq!(json["audit"]["difference"], 0);
    assert_eq!(json["audit"]["initial_total"], 400);
    assert_eq!(json["audit"]["population_size"], 4);
    assert_eq!(json["immortals"].as_array().unwrap().len(), 4);
    assert!(state.current().await.unwrap().is_paused());

    let response = router.clone().oneshot(get("/api/operator/report")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    let text = body_to_text(response.into_body()).await;
    assert!(text.contains("Population size  : 4"));
    assert!(text.contains("Invariant Status : OK"));

    router
        .clone()
        .oneshot(post("/api/operator/resume", ""))
        .await
        .unwrap();
    assert!(!state.current().await.unwrap().is_paused());

    state.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_check_omits_individuals_above_limit() {
    let mut config = test_config();
    config.operator.show_individual_limit = 2;
    let (state, router) = app(&config);
    router
        .clone()
        .oneshot(post("/api/operator/start", r#"{"count": 3}"#))
        .await
        .unwrap();

    let response = router.clone().oneshot(get("/api/operator/check")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert!(json["immortals"].is_null());

    let response = router.clone().oneshot(get("/api/operator/report")).await.unwrap();
    let text = body_to_text(response.into_body()).await;
    assert!(text.starts_with("(Showing summary for 3 immortals)"));

    state.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_dead_reports_counts() {
    let (state, router) = app(&test_config());
    router
        .clone()
        .oneshot(post(
            "/api/operator/start",
            r#"{"count": 6, "initial_health": 20, "damage": 10}"#,
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = router
        .clone()
        .oneshot(post("/api/operator/remove-dead", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;

    let before = json["population_before"].as_u64().unwrap();
    let removed = json["removed"].as_u64().unwrap();
    let after = json["population_after"].as_u64().unwrap();
    assert_eq!(before, 6);
    assert_eq!(after, before - removed);
    assert_eq!(json["still_alive"].as_u64().unwrap(), after);

    let response = router
        .clone()
        .oneshot(post("/api/operator/remove-dead?format=text", ""))
        .await
        .unwrap();
    let text = body_to_text(response.into_body()).await;
    assert!(text.contains("Removed (dead):    0"));
    assert!(text.contains(&format!("Population before: {after}")));

    let response = router.clone().oneshot(get("/api/immortals")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    let immortals = json.as_array().unwrap();
    assert_eq!(immortals.len() as u64, after);
    assert!(immortals.iter().all(|i| i["health"].as_i64().unwrap() > 0));

    state.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_naive_deadlock_answers_service_unavailable() {
    let mut config = test_config();
    config.worker.lock_handoff_ms = 5;
    config.operator.settle_timeout_ms = 100;
    config.operator.report_timeout_ms = 100;
    config.operator.stop_grace_ms = 100;
    let (state, router) = app(&config);
    router
        .clone()
        .oneshot(post(
            "/api/operator/start",
            r#"{"count": 2, "strategy": "naive", "initial_health": 1000000}"#,
        ))
        .await
        .unwrap();

    let mut saw_unavailable = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let response = router.clone().oneshot(get("/api/immortals")).await.unwrap();
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            let json = body_to_json(response.into_body()).await;
            assert_eq!(json["status"], 503);
            saw_unavailable = true;
            break;
        }
    }
    assert!(saw_unavailable, "naive run never deadlocked");

    let response = router.clone().oneshot(get("/api/operator/report")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Removal cannot read the held health locks, so nothing is removed.
    let response = router
        .clone()
        .oneshot(post("/api/operator/remove-dead", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.current().await.unwrap().population_size().await, 2);

    let response = router
        .clone()
        .oneshot(post("/api/operator/stop", ""))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stalled"], 2);
}
