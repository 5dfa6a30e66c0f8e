// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wake callbacks from the host.
//!
//! These endpoints are called by the host scheduler or login watcher, not
//! by users. They are protected by the task token middleware.

use crate::services::alarms::SYNC_ALARM_NAME;
use crate::services::endpoint::RemoteAuth;
use crate::sync::TriggerOutcome;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Task handler routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks/alarm", post(alarm_fired))
        .route("/tasks/login-detected", post(login_detected))
}

#[derive(Debug, Deserialize)]
struct AlarmPayload {
    name: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TriggerOutcome>,
}

/// Alarm fired. The body may name the alarm; it defaults to the sync alarm.
async fn alarm_fired(State(state): State<Arc<AppState>>, body: Bytes) -> Json<TaskResponse> {
    let name = serde_json::from_slice::<AlarmPayload>(&body)
        .map(|p| p.name)
        .unwrap_or_else(|_| SYNC_ALARM_NAME.to_string());

    tracing::info!(alarm = %name, "Alarm callback received");
    let outcome = state.orchestrator.on_alarm(&name).await;
    Json(TaskResponse {
        handled: outcome.is_some(),
        outcome,
    })
}

/// Session cookies observed at login. Both must be present to be used.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    li_at: Option<String>,
    jsession_id: Option<String>,
}

impl LoginPayload {
    fn into_auth(self) -> Option<RemoteAuth> {
        match (self.li_at, self.jsession_id) {
            (Some(li_at), Some(jsession_id)) if !li_at.is_empty() && !jsession_id.is_empty() => {
                Some(RemoteAuth::from_cookies(li_at, jsession_id))
            }
            _ => None,
        }
    }
}

/// Login detected. The body may carry the new session cookies.
async fn login_detected(State(state): State<Arc<AppState>>, body: Bytes) -> Json<TaskResponse> {
    let auth = serde_json::from_slice::<LoginPayload>(&body)
        .unwrap_or_default()
        .into_auth();
    let outcome = state.orchestrator.on_login_detected(auth).await;
    Json(TaskResponse {
        handled: true,
        outcome: Some(outcome),
    })
}
