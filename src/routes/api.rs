// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync control API for the UI (requires authentication).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{SyncConfig, SyncConfigPatch, SyncState};
use crate::sync::{DiagnosticReport, TriggerOutcome};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync/state", get(get_sync_state))
        .route("/api/sync/config", get(get_sync_config).put(update_sync_config))
        .route("/api/sync/enable", post(enable_sync))
        .route("/api/sync/disable", post(disable_sync))
        .route("/api/sync/reset-breaker", post(reset_circuit_breaker))
        .route("/api/sync/trigger", post(trigger_sync))
        .route("/api/sync/diagnostics", get(run_diagnostic))
        .route("/api/activity", post(record_activity))
}

fn validated(patch: SyncConfigPatch) -> Result<SyncConfigPatch> {
    patch
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(patch)
}

/// Parse an optional JSON body; an empty body means no overrides.
fn optional_patch(body: &Bytes) -> Result<SyncConfigPatch> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SyncConfigPatch::default());
    }
    let patch: SyncConfigPatch = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid config patch: {}", e)))?;
    validated(patch)
}

// ─── Sync State & Config ─────────────────────────────────────

async fn get_sync_state(State(state): State<Arc<AppState>>) -> Json<SyncState> {
    Json(state.orchestrator.get_sync_state().await)
}

async fn get_sync_config(State(state): State<Arc<AppState>>) -> Json<SyncConfig> {
    Json(state.orchestrator.get_sync_config().await)
}

async fn enable_sync(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<SyncConfig>> {
    let overrides = optional_patch(&body)?;
    tracing::info!(subject = %user.subject, "Enable background sync requested");
    Ok(Json(state.orchestrator.enable(&overrides).await))
}

async fn disable_sync(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<SyncConfig> {
    tracing::info!(subject = %user.subject, "Disable background sync requested");
    Json(state.orchestrator.disable().await)
}

async fn update_sync_config(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SyncConfigPatch>,
) -> Result<Json<SyncConfig>> {
    let patch = validated(patch)?;
    Ok(Json(state.orchestrator.update_config(&patch).await))
}

async fn reset_circuit_breaker(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<SyncState> {
    tracing::info!(subject = %user.subject, "Circuit breaker reset requested");
    Json(state.orchestrator.reset_circuit_breaker().await)
}

// ─── Manual Operations ───────────────────────────────────────

/// "Sync now". Runs the cycle inline and reports what happened.
async fn trigger_sync(State(state): State<Arc<AppState>>) -> Json<TriggerOutcome> {
    Json(state.orchestrator.trigger_sync(true).await)
}

async fn run_diagnostic(State(state): State<Arc<AppState>>) -> Json<DiagnosticReport> {
    Json(state.orchestrator.run_diagnostic().await)
}

#[derive(Debug, Default, Deserialize)]
struct ActivityBody {
    /// When the user was last active (ms); defaults to now
    at: Option<i64>,
}

/// Record user activity for the active-hours gate.
async fn record_activity(State(state): State<Arc<AppState>>, body: Bytes) -> Result<StatusCode> {
    let activity: ActivityBody = if body.iter().all(u8::is_ascii_whitespace) {
        ActivityBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid activity body: {}", e)))?
    };

    let at = activity.at.unwrap_or_else(crate::time_utils::now_millis);
    state.orchestrator.store().record_user_activity(at).await;
    Ok(StatusCode::NO_CONTENT)
}
