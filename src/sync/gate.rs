// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Precondition gate evaluated before every cycle.

use super::safety;
use super::SyncOrchestrator;
use serde::Serialize;

pub const REASON_DISABLED: &str = "Background sync is disabled";
pub const REASON_BREAKER_TRIPPED: &str = "Circuit breaker tripped, reset required";
pub const REASON_NOT_AUTHENTICATED: &str = "Not authenticated with remote service";
pub const REASON_USER_INACTIVE: &str = "User inactive for more than 2 hours";
pub const REASON_TOO_SOON: &str = "Too soon since last sync";

/// Result of the precondition gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDecision {
    pub can_sync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SyncDecision {
    pub fn allow() -> Self {
        Self {
            can_sync: true,
            reason: None,
        }
    }

    pub fn refuse(reason: &str) -> Self {
        Self {
            can_sync: false,
            reason: Some(reason.to_string()),
        }
    }
}

impl SyncOrchestrator {
    /// Decide whether a cycle may run now. Checks short-circuit in order.
    pub async fn should_sync_now(&self, manual: bool) -> SyncDecision {
        let config = self.store.get_config().await;
        if !config.enabled {
            return SyncDecision::refuse(REASON_DISABLED);
        }

        let state = self.store.get_state().await;
        if state.circuit_breaker_tripped {
            return SyncDecision::refuse(REASON_BREAKER_TRIPPED);
        }

        if !self.client.is_authenticated().await {
            return SyncDecision::refuse(REASON_NOT_AUTHENTICATED);
        }

        let now = crate::time_utils::now_millis();
        if config.active_hours_only && !manual {
            let last_active = self.store.last_user_activity().await;
            if !safety::user_recently_active(last_active, now) {
                return SyncDecision::refuse(REASON_USER_INACTIVE);
            }
        }

        if !safety::min_interval_elapsed(state.last_sync_time, now) {
            return SyncDecision::refuse(REASON_TOO_SOON);
        }

        SyncDecision::allow()
    }
}
