// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret authentication for host wake callbacks (`/tasks/*`).

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the task token.
pub const TASK_TOKEN_HEADER: &str = "x-sync-task-token";

/// Constant-time comparison of a presented token with the configured one.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

/// Require the task token header on `/tasks/*` routes.
pub async fn require_task_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(TASK_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());

    match presented {
        Some(token) if token_matches(token, &state.config.task_token) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            tracing::warn!("Blocked tasks request with invalid token");
            Err(StatusCode::FORBIDDEN)
        }
        None => {
            tracing::warn!("Blocked tasks request without token header");
            Err(StatusCode::FORBIDDEN)
        }
    }
}
