// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end self-test for troubleshooting.
//!
//! Walks every layer in order: credentials, network, storage, stored
//! identifiers, and one identifier-dependent call. Never touches the sync
//! state or config documents.

use super::SyncOrchestrator;
use crate::models::EndpointType;
use serde::Serialize;
use serde_json::{json, Value};

/// Scratch key used by the storage round-trip.
const MARKER_KEY: &str = "sync_diagnostic_marker";

const CSRF_PREFIX: &str = "ajax:";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticStep {
    pub step: String,
    pub passed: bool,
    /// Not run because an earlier step it depends on failed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl DiagnosticStep {
    fn pass(step: &str, detail: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            passed: true,
            skipped: false,
            detail: detail.into(),
            data: None,
        }
    }

    fn fail(step: &str, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::pass(step, detail)
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub passed: bool,
    pub steps: Vec<DiagnosticStep>,
}

impl DiagnosticReport {
    fn finish(steps: Vec<DiagnosticStep>) -> Self {
        let passed = steps.iter().all(|s| s.passed || s.skipped);
        Self { passed, steps }
    }
}

/// Whether a CSRF token looks like `ajax:<digits>`.
pub fn csrf_token_well_formed(token: &str) -> bool {
    token
        .strip_prefix(CSRF_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Whether a payload has the remote API's normalized envelope.
fn has_normalized_shape(payload: &Value) -> bool {
    ["data", "included", "elements"]
        .iter()
        .any(|k| payload.get(*k).is_some())
}

impl SyncOrchestrator {
    pub async fn run_diagnostic(&self) -> DiagnosticReport {
        let mut steps = Vec::new();

        let Some(auth) = self.client.auth().await else {
            steps.push(DiagnosticStep::fail("auth", "No session cookies available"));
            return DiagnosticReport::finish(steps);
        };
        steps.push(DiagnosticStep::pass("auth", "Session cookies present"));

        steps.push(if csrf_token_well_formed(&auth.csrf_token) {
            DiagnosticStep::pass("csrf", "CSRF token well formed")
        } else {
            DiagnosticStep::fail("csrf", "CSRF token has unexpected shape")
        });

        let me = self.client.fetch_current_user_profile().await;
        let status = json!({ "status": me.status });
        if !me.success || me.is_auth_error() {
            steps.push(
                DiagnosticStep::fail("network", format!("Request failed: {}", me.error_message()))
                    .with_data(status),
            );
            return DiagnosticReport::finish(steps);
        }
        steps.push(DiagnosticStep::pass("network", "Current user request succeeded").with_data(status));

        let shape_ok = me.data.as_ref().is_some_and(has_normalized_shape);
        steps.push(if shape_ok {
            DiagnosticStep::pass("shape", "Response has normalized shape")
        } else {
            DiagnosticStep::fail("shape", "Response shape not recognized")
        });

        steps.push(self.storage_round_trip().await);

        let ids = self.store.profile_identifiers().await;
        let ids_data = json!({
            "profileUrn": ids.profile_urn,
            "publicIdentifier": ids.public_identifier,
        });
        let have_urn = ids.profile_urn.is_some();
        steps.push(if have_urn {
            DiagnosticStep::pass("identifiers", "Profile identifiers stored").with_data(ids_data)
        } else {
            DiagnosticStep::fail("identifiers", "No stored profile URN").with_data(ids_data)
        });

        if have_urn {
            let resp = self
                .client
                .fetch_endpoint(
                    EndpointType::NetworkInfo,
                    ids.profile_urn.as_deref(),
                    ids.public_identifier.as_deref(),
                )
                .await;
            let status = json!({ "status": resp.status });
            steps.push(if resp.success {
                DiagnosticStep::pass("endpoint", "networkInfo request succeeded").with_data(status)
            } else {
                DiagnosticStep::fail("endpoint", format!("networkInfo failed: {}", resp.error_message()))
                    .with_data(status)
            });
        } else {
            steps.push(DiagnosticStep {
                skipped: true,
                ..DiagnosticStep::fail("endpoint", "Skipped, no identifiers")
            });
        }

        let report = DiagnosticReport::finish(steps);
        tracing::info!(passed = report.passed, "Diagnostic finished");
        report
    }

    async fn storage_round_trip(&self) -> DiagnosticStep {
        let kv = self.store.kv();
        let marker = json!({ "marker": crate::time_utils::now_millis() });

        if let Err(e) = kv.set(MARKER_KEY, marker.clone()).await {
            return DiagnosticStep::fail("storage", format!("Write failed: {}", e));
        }
        let read = kv.get(MARKER_KEY).await;
        if let Err(e) = kv.remove(MARKER_KEY).await {
            tracing::warn!(error = %e, "Failed to remove diagnostic marker");
        }

        match read {
            Ok(Some(v)) if v == marker => DiagnosticStep::pass("storage", "Round trip succeeded"),
            Ok(_) => DiagnosticStep::fail("storage", "Read back a different value"),
            Err(e) => DiagnosticStep::fail("storage", format!("Read failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::keys;
    use crate::services::endpoint::EndpointResponse;
    use crate::sync::testing::Harness;

    #[test]
    fn test_csrf_shape() {
        assert!(csrf_token_well_formed("ajax:1234567890"));
        assert!(!csrf_token_well_formed("ajax:"));
        assert!(!csrf_token_well_formed("1234"));
        assert!(!csrf_token_well_formed("ajax:12ab"));
    }

    #[tokio::test]
    async fn test_stops_without_auth() {
        let h = Harness::enabled().await;
        h.client.set_authenticated(false);

        let report = h.orchestrator.run_diagnostic().await;
        assert!(!report.passed);
        assert_eq!(report.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_stops_after_network_failure() {
        let h = Harness::enabled().await;
        h.client
            .respond_current_user(EndpointResponse::failed(401, "Unauthorized"));

        let report = h.orchestrator.run_diagnostic().await;
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.steps[2].step, "network");
        assert!(!report.steps[2].passed);
    }

    #[tokio::test]
    async fn test_full_pass_leaves_state_untouched() {
        let h = Harness::enabled().await;
        let state_before = h.store.kv().get(keys::SYNC_STATE).await.unwrap();
        let config_before = h.store.kv().get(keys::SYNC_CONFIG).await.unwrap();

        let report = h.orchestrator.run_diagnostic().await;

        assert!(report.passed, "{:?}", report);
        assert_eq!(report.steps.len(), 7);
        assert_eq!(h.store.kv().get(keys::SYNC_STATE).await.unwrap(), state_before);
        assert_eq!(h.store.kv().get(keys::SYNC_CONFIG).await.unwrap(), config_before);
        assert!(h.store.kv().get(MARKER_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_endpoint_step_skipped_without_identifiers() {
        let h = Harness::new();

        let report = h.orchestrator.run_diagnostic().await;

        let last = report.steps.last().unwrap();
        assert_eq!(last.step, "endpoint");
        assert!(last.skipped);
        assert!(!report.steps[5].passed);
        assert!(!report.passed);
    }
}
