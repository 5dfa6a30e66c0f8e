// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote analytics API client.
//!
//! Handles:
//! - Cookie + CSRF session authentication
//! - Per-endpoint request paths with URL-encoded identifiers
//! - Rate limit and auth failure classification

use crate::error::AppError;
use crate::models::EndpointType;
use crate::services::endpoint::{EndpointClient, EndpointResponse, RemoteAuth};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://www.linkedin.com/voyager/api";

/// Normalized JSON media type understood by the API.
const ACCEPT_NORMALIZED: &str = "application/vnd.linkedin.normalized+json+2.1";

/// Longest error body kept in error messages.
const MAX_ERROR_BODY: usize = 200;

/// Remote API client using the member's session cookies.
pub struct RemoteApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: RwLock<Option<RemoteAuth>>,
}

impl RemoteApiClient {
    /// Create a client with optional session credentials.
    pub fn new(base_url: impl Into<String>, auth: Option<RemoteAuth>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: RwLock::new(auth),
        }
    }

    /// Request path for an endpoint, or `None` if a required identifier is missing.
    pub fn endpoint_path(
        endpoint: EndpointType,
        profile_urn: Option<&str>,
        public_identifier: Option<&str>,
    ) -> Option<String> {
        let urn = || profile_urn.map(|u| urlencoding::encode(u).into_owned());
        let path = match endpoint {
            EndpointType::Analytics => {
                "/identity/dash/creatorAnalytics?q=creatorDashboard".to_string()
            }
            EndpointType::Audience => {
                "/identity/dash/creatorAnalytics?q=followerDemographics".to_string()
            }
            EndpointType::Profile => format!(
                "/identity/dash/profiles?q=memberIdentity&memberIdentity={}\
                 &decorationId=com.linkedin.voyager.dash.deco.identity.profile.TopCardCore",
                urlencoding::encode(public_identifier?)
            ),
            EndpointType::MyPosts => format!(
                "/identity/profileUpdatesV2?q=memberShareFeed&count=20&profileUrn={}",
                urn()?
            ),
            EndpointType::ProfileViews => format!(
                "/identity/wvmpCards?q=cardsCollection&profileUrn={}",
                urn()?
            ),
            EndpointType::NetworkInfo => format!(
                "/identity/dash/profileNetworkInfo?q=profile&profileUrn={}",
                urn()?
            ),
        };
        Some(path)
    }

    /// Generic authenticated GET returning a classified response.
    async fn get_json(&self, path: &str) -> EndpointResponse {
        let Some(auth) = self.auth.read().await.clone() else {
            return EndpointResponse::failed(401, AppError::REMOTE_AUTH_ERROR);
        };

        let url = format!("{}{}", self.base_url, path);
        let response = match self
            .http
            .get(&url)
            .header(
                reqwest::header::COOKIE,
                format!("li_at={}; JSESSIONID={}", auth.li_at, auth.jsession_id),
            )
            .header("csrf-token", &auth.csrf_token)
            .header("x-restli-protocol-version", "2.0.0")
            .header(reqwest::header::ACCEPT, ACCEPT_NORMALIZED)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path, error = %e, "Remote request failed");
                return EndpointResponse::failed(0, e.to_string());
            }
        };

        Self::check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json(response: reqwest::Response) -> EndpointResponse {
        let status = response.status();
        let code = status.as_u16();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if code == 429 {
                tracing::warn!("Remote rate limit hit (429)");
                return EndpointResponse::failed(code, AppError::REMOTE_RATE_LIMIT);
            }

            if code == 401 || code == 403 {
                return EndpointResponse::failed(code, AppError::REMOTE_AUTH_ERROR);
            }

            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return EndpointResponse::failed(code, format!("HTTP {}: {}", status, body));
        }

        match response.json::<Value>().await {
            Ok(data) => EndpointResponse::ok(code, data),
            Err(e) => EndpointResponse::failed(code, format!("JSON parse error: {}", e)),
        }
    }
}

#[async_trait]
impl EndpointClient for RemoteApiClient {
    async fn fetch_endpoint(
        &self,
        endpoint: EndpointType,
        profile_urn: Option<&str>,
        public_identifier: Option<&str>,
    ) -> EndpointResponse {
        let Some(path) = Self::endpoint_path(endpoint, profile_urn, public_identifier) else {
            return EndpointResponse::failed(
                0,
                format!("Missing identifier for endpoint {}", endpoint),
            );
        };

        tracing::debug!(endpoint = %endpoint, "Fetching remote endpoint");
        self.get_json(&path).await
    }

    async fn fetch_current_user_profile(&self) -> EndpointResponse {
        self.get_json("/me").await
    }

    async fn is_authenticated(&self) -> bool {
        self.auth
            .read()
            .await
            .as_ref()
            .is_some_and(|a| !a.li_at.is_empty() && !a.csrf_token.is_empty())
    }

    async fn auth(&self) -> Option<RemoteAuth> {
        self.auth.read().await.clone()
    }

    async fn set_auth(&self, auth: Option<RemoteAuth>) {
        *self.auth.write().await = auth;
    }
}
