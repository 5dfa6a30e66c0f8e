// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

async fn send(method: &str, uri: &str, body: serde_json::Value) -> StatusCode {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(&state.config);

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
    .status()
}

#[tokio::test]
async fn test_zero_interval_rejected() {
    let status = send("PUT", "/api/sync/config", json!({"baseIntervalMinutes": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_call_budget_above_endpoint_count_rejected() {
    let status = send("PUT", "/api/sync/config", json!({"maxApiCallsPerSync": 7})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enable_with_invalid_override_rejected() {
    let status = send("POST", "/api/sync/enable", json!({"maxConsecutiveFailures": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_activity_rejected() {
    let status = send("POST", "/api/activity", json!({"at": "yesterday"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_valid_patch_accepted() {
    let status = send(
        "PUT",
        "/api/sync/config",
        json!({"baseIntervalMinutes": 60, "endpoints": {"myPosts": false, "bogus": true}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
