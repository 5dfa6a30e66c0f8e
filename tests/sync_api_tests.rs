// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Control API round trips against an in-memory store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use profile_sync::services::alarms::SYNC_ALARM_NAME;
use profile_sync::services::AlarmScheduler;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn call(
    app: &Router,
    token: &str,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, common::body_json(response).await)
}

#[tokio::test]
async fn test_defaults_before_any_change() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    let (status, config) = call(&app, &token, "GET", "/api/sync/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["enabled"], false);
    assert_eq!(config["baseIntervalMinutes"], 120);
    assert_eq!(config["maxApiCallsPerSync"], 3);

    let (_, sync_state) = call(&app, &token, "GET", "/api/sync/state", None).await;
    assert_eq!(sync_state["consecutiveFailures"], 0);
    assert_eq!(sync_state["circuitBreakerTripped"], false);
    assert_eq!(sync_state["syncHistory"], json!([]));
}

#[tokio::test]
async fn test_enable_then_disable() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    let (status, config) = call(
        &app,
        &token,
        "POST",
        "/api/sync/enable",
        Some(json!({"baseIntervalMinutes": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["enabled"], true);
    assert_eq!(config["baseIntervalMinutes"], 60);
    assert!(state
        .orchestrator
        .alarms()
        .next_due(SYNC_ALARM_NAME)
        .await
        .unwrap()
        .is_some());

    let (_, sync_state) = call(&app, &token, "GET", "/api/sync/state", None).await;
    assert_eq!(sync_state["enabled"], true);
    assert!(sync_state["nextSyncTime"].is_i64());

    let (status, config) = call(&app, &token, "POST", "/api/sync/disable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["enabled"], false);
    assert!(state
        .orchestrator
        .alarms()
        .next_due(SYNC_ALARM_NAME)
        .await
        .unwrap()
        .is_none());

    let (_, sync_state) = call(&app, &token, "GET", "/api/sync/state", None).await;
    assert_eq!(sync_state["enabled"], false);
    assert!(sync_state["nextSyncTime"].is_null());
}

#[tokio::test]
async fn test_enable_without_body_uses_defaults() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    let (status, config) = call(&app, &token, "POST", "/api/sync/enable", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["enabled"], true);
    assert_eq!(config["baseIntervalMinutes"], 120);
}

#[tokio::test]
async fn test_trigger_refused_when_disabled() {
    let (app, state, client) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    let (status, outcome) = call(&app, &token, "POST", "/api/sync/trigger", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "refused");
    assert_eq!(outcome["reason"], "Background sync is disabled");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_trigger_runs_cycle_when_enabled() {
    let (app, state, client) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);
    common::seed_enabled(&state, Default::default()).await;

    let (status, outcome) = call(&app, &token, "POST", "/api/sync/trigger", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "completed");
    assert_eq!(outcome["entry"]["success"], true);
    assert_eq!(outcome["entry"]["apiCallCount"], 3);
    assert_eq!(client.call_count(), 3);

    let (_, sync_state) = call(&app, &token, "GET", "/api/sync/state", None).await;
    assert_eq!(sync_state["totalSyncs"], 1);
    assert_eq!(sync_state["totalApiCalls"], 3);
}

#[tokio::test]
async fn test_reset_breaker_clears_failures() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);
    let store = state.orchestrator.store();
    let mut sync_state = store.get_state().await;
    sync_state.circuit_breaker_tripped = true;
    sync_state.consecutive_failures = 5;
    store.save_state(&sync_state).await;

    let (status, body) = call(&app, &token, "POST", "/api/sync/reset-breaker", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["circuitBreakerTripped"], false);
    assert_eq!(body["consecutiveFailures"], 0);
}

#[tokio::test]
async fn test_activity_recorded() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    let (status, _) = call(
        &app,
        &token,
        "POST",
        "/api/activity",
        Some(json!({"at": 1_700_000_000_000i64})),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        state.orchestrator.store().last_user_activity().await,
        Some(1_700_000_000_000)
    );
}

#[tokio::test]
async fn test_diagnostics_report() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    let (status, report) = call(&app, &token, "GET", "/api/sync/diagnostics", None).await;

    assert_eq!(status, StatusCode::OK);
    let steps = report["steps"].as_array().unwrap();
    assert!(!steps.is_empty());
    assert_eq!(steps[0]["passed"], true);
}

#[tokio::test]
async fn test_diagnostics_stop_when_unauthenticated() {
    let (app, state, client) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);
    client.set_authenticated(false);

    let (_, report) = call(&app, &token, "GET", "/api/sync/diagnostics", None).await;

    assert_eq!(report["passed"], false);
    assert_eq!(report["steps"].as_array().unwrap().len(), 1);
    assert_eq!(client.call_count(), 0);
}
