// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contract of the remote endpoint client.
//!
//! The orchestrator only depends on this trait. Failures are reported as
//! values so that one failing endpoint never aborts a sync cycle.

use crate::models::EndpointType;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Outcome of one authenticated call to the remote API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointResponse {
    pub success: bool,
    /// HTTP status, 0 when no response was received
    pub status: u16,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl EndpointResponse {
    pub fn ok(status: u16, data: Value) -> Self {
        Self {
            success: true,
            status,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Error text for logs and history, never empty.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}

/// Session credentials for the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAuth {
    /// Session cookie
    pub li_at: String,
    /// Raw JSESSIONID cookie value
    pub jsession_id: String,
    /// Anti-forgery token derived from the JSESSIONID
    pub csrf_token: String,
}

impl RemoteAuth {
    /// Build credentials from raw cookie values.
    ///
    /// The CSRF token is the JSESSIONID with surrounding quotes removed.
    pub fn from_cookies(li_at: impl Into<String>, jsession_id: impl Into<String>) -> Self {
        let jsession_id = jsession_id.into();
        let csrf_token = jsession_id.trim_matches('"').to_string();
        Self {
            li_at: li_at.into(),
            jsession_id,
            csrf_token,
        }
    }
}

/// Authenticated access to the remote API.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    /// Call one endpoint with the identifiers it needs.
    async fn fetch_endpoint(
        &self,
        endpoint: EndpointType,
        profile_urn: Option<&str>,
        public_identifier: Option<&str>,
    ) -> EndpointResponse;

    /// Call the parameterless "current user" endpoint.
    async fn fetch_current_user_profile(&self) -> EndpointResponse;

    /// Whether usable session credentials are present.
    async fn is_authenticated(&self) -> bool;

    /// Current session credentials, if any.
    async fn auth(&self) -> Option<RemoteAuth>;

    /// Replace the session credentials (e.g. after a login was detected).
    async fn set_auth(&self, auth: Option<RemoteAuth>);
}
