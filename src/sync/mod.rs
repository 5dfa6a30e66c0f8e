// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background sync orchestration: gate, scheduler, executor, diagnostics.

pub mod diagnostics;
pub mod executor;
pub mod gate;
pub mod orchestrator;
pub mod safety;
pub mod scheduler;

pub use diagnostics::{DiagnosticReport, DiagnosticStep};
pub use executor::{select_endpoints, RequestPacing, TriggerOutcome};
pub use gate::SyncDecision;
pub use orchestrator::SyncOrchestrator;

#[cfg(test)]
pub(crate) mod testing {
    //! In-process fakes for orchestrator tests.

    use super::{RequestPacing, SyncOrchestrator};
    use crate::db::{keys, InMemoryStore, StateStore};
    use crate::models::{EndpointType, ProfileRecord, SyncConfig, SyncState};
    use crate::services::alarms::StoredAlarms;
    use crate::services::endpoint::{EndpointClient, EndpointResponse, RemoteAuth};
    use crate::services::outbound::LocalOutbox;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted endpoint client. Unscripted endpoints answer 200 with `{}`.
    pub struct FakeClient {
        authenticated: AtomicBool,
        responses: Mutex<HashMap<EndpointType, EndpointResponse>>,
        current_user: Mutex<EndpointResponse>,
        calls: Mutex<Vec<(EndpointType, Option<String>)>>,
    }

    impl FakeClient {
        pub fn new() -> Self {
            Self {
                authenticated: AtomicBool::new(true),
                responses: Mutex::new(HashMap::new()),
                current_user: Mutex::new(EndpointResponse::ok(
                    200,
                    json!({"data": {}, "included": []}),
                )),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn set_authenticated(&self, authenticated: bool) {
            self.authenticated.store(authenticated, Ordering::SeqCst);
        }

        pub fn respond(&self, endpoint: EndpointType, response: EndpointResponse) {
            self.responses.lock().unwrap().insert(endpoint, response);
        }

        pub fn respond_current_user(&self, response: EndpointResponse) {
            *self.current_user.lock().unwrap() = response;
        }

        /// Endpoint fetches so far, with the profile URN passed.
        pub fn calls(&self) -> Vec<(EndpointType, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EndpointClient for FakeClient {
        async fn fetch_endpoint(
            &self,
            endpoint: EndpointType,
            profile_urn: Option<&str>,
            _public_identifier: Option<&str>,
        ) -> EndpointResponse {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint, profile_urn.map(str::to_string)));
            self.responses
                .lock()
                .unwrap()
                .get(&endpoint)
                .cloned()
                .unwrap_or_else(|| EndpointResponse::ok(200, json!({})))
        }

        async fn fetch_current_user_profile(&self) -> EndpointResponse {
            self.current_user.lock().unwrap().clone()
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

    pub struct Harness {
        pub kv: Arc<InMemoryStore>,
        pub store: StateStore,
        pub client: Arc<FakeClient>,
        pub alarms: Arc<StoredAlarms>,
        pub orchestrator: Arc<SyncOrchestrator>,
    }

    impl Harness {
        /// Defaults everywhere: sync disabled, no stored profile.
        pub fn new() -> Self {
            let kv = Arc::new(InMemoryStore::new());
            let store = StateStore::new(kv.clone());
            let client = Arc::new(FakeClient::new());
            let alarms = Arc::new(StoredAlarms::new(kv.clone()));
            let outbox = Arc::new(LocalOutbox::new(kv.clone()));
            let orchestrator = Arc::new(
                SyncOrchestrator::new(store.clone(), client.clone(), outbox, alarms.clone())
                    .with_pacing(RequestPacing::NONE),
            );
            Self {
                kv,
                store,
                client,
                alarms,
                orchestrator,
            }
        }

        /// Sync enabled with a stored profile carrying both identifiers.
        pub async fn enabled() -> Self {
            let h = Self::new();
            h.store
                .save_config(&SyncConfig {
                    enabled: true,
                    ..Default::default()
                })
                .await;
            h.store
                .save_document(
                    keys::PROFILE,
                    &ProfileRecord {
                        profile_urn: Some("urn:li:fsd_profile:ACoTEST".into()),
                        public_identifier: Some("test-user".into()),
                        ..Default::default()
                    },
                )
                .await;
            h
        }

        pub async fn update_state(&self, f: impl FnOnce(&mut SyncState)) {
            let mut state = self.store.get_state().await;
            f(&mut state);
            self.store.save_state(&state).await;
        }
    }
}
