// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use profile_sync::config::Config;
use profile_sync::db::{keys, InMemoryStore, StateStore};
use profile_sync::models::{EndpointType, ProfileRecord, SyncConfig, SyncState};
use profile_sync::routes::create_router;
use profile_sync::services::{
    EndpointClient, EndpointResponse, LocalOutbox, RemoteAuth, StoredAlarms,
};
use profile_sync::sync::{RequestPacing, SyncOrchestrator};
use profile_sync::AppState;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Endpoint client answering every call with the same response.
pub struct StubClient {
    authenticated: AtomicBool,
    response: Mutex<EndpointResponse>,
    calls: Mutex<Vec<EndpointType>>,
}

#[allow(dead_code)]
impl StubClient {
    pub fn new() -> Self {
        Self {
            authenticated: AtomicBool::new(true),
            response: Mutex::new(EndpointResponse::ok(200, json!({}))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    pub fn respond_with(&self, response: EndpointResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EndpointClient for StubClient {
    async fn fetch_endpoint(
        &self,
        endpoint: EndpointType,
        _profile_urn: Option<&str>,
        _public_identifier: Option<&str>,
    ) -> EndpointResponse {
        self.calls.lock().unwrap().push(endpoint);
        self.response.lock().unwrap().clone()
    }

    async fn fetch_current_user_profile(&self) -> EndpointResponse {
        EndpointResponse::ok(200, json!({"data": {}, "included": []}))
    }

    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn auth(&self) -> Option<RemoteAuth> {
        self.authenticated
            .load(Ordering::SeqCst)
            .then(|| RemoteAuth::from_cookies("AQEDtest", "\"ajax:1234567890\""))
    }

    async fn set_auth(&self, auth: Option<RemoteAuth>) {
        self.authenticated.store(auth.is_some(), Ordering::SeqCst);
    }
}

/// Create a test app backed by an in-memory store and a stub client.
/// Returns the router, the shared state and the client.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<StubClient>) {
    let config = Config::test_default();
    let kv = Arc::new(InMemoryStore::new());
    let client = Arc::new(StubClient::new());

    let orchestrator = Arc::new(
        SyncOrchestrator::new(
            StateStore::new(kv.clone()),
            client.clone(),
            Arc::new(LocalOutbox::new(kv.clone())),
            Arc::new(StoredAlarms::new(kv)),
        )
        .with_pacing(RequestPacing::NONE),
    );

    let state = Arc::new(AppState {
        config,
        orchestrator,
    });

    (create_router(state.clone()), state, client)
}

/// Create a bearer token accepted by the API.
#[allow(dead_code)]
pub fn create_test_jwt(config: &Config) -> String {
    profile_sync::middleware::auth::create_jwt("test-user", &config.api_signing_key).unwrap()
}

/// Enable sync and store a profile with both identifiers.
#[allow(dead_code)]
pub async fn seed_enabled(state: &AppState, config: SyncConfig) {
    let store = state.orchestrator.store();
    store
        .save_config(&SyncConfig {
            enabled: true,
            ..config
        })
        .await;
    store
        .save_document(
            keys::PROFILE,
            &ProfileRecord {
                profile_urn: Some("urn:li:fsd_profile:ACoTEST".into()),
                public_identifier: Some("test-user".into()),
                ..Default::default()
            },
        )
        .await;
}

/// Pretend the last cycle happened long ago so the interval check passes.
#[allow(dead_code)]
pub async fn rewind_last_sync(state: &AppState) {
    let store = state.orchestrator.store();
    let mut sync_state: SyncState = store.get_state().await;
    sync_state.last_sync_time = None;
    store.save_state(&sync_state).await;
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
