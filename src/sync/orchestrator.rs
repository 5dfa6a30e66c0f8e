// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The per-process sync orchestrator.
//!
//! All scheduling state lives in the store. The orchestrator itself only
//! holds the reentrancy flag and the one-time initialization flag, so a
//! restarted process picks up exactly where the last one left off.

use super::executor::{RequestPacing, TriggerOutcome};
use crate::db::StateStore;
use crate::models::{SyncConfig, SyncState};
use crate::services::alarms::{
    run_alarm_loop, AlarmScheduler, ALARM_POLL_INTERVAL, SYNC_ALARM_NAME,
};
use crate::services::endpoint::{EndpointClient, RemoteAuth};
use crate::services::outbound::OutboundSync;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct SyncOrchestrator {
    pub(crate) store: StateStore,
    pub(crate) client: Arc<dyn EndpointClient>,
    pub(crate) outbound: Arc<dyn OutboundSync>,
    pub(crate) alarms: Arc<dyn AlarmScheduler>,
    pub(crate) pacing: RequestPacing,
    /// Set while a cycle runs.
    pub(crate) running: AtomicBool,
    initialized: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(
        store: StateStore,
        client: Arc<dyn EndpointClient>,
        outbound: Arc<dyn OutboundSync>,
        alarms: Arc<dyn AlarmScheduler>,
    ) -> Self {
        Self {
            store,
            client,
            outbound,
            alarms,
            pacing: RequestPacing::default(),
            running: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        }
    }

    /// Override the delay drawn between endpoint requests.
    pub fn with_pacing(mut self, pacing: RequestPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn alarms(&self) -> &Arc<dyn AlarmScheduler> {
        &self.alarms
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn get_sync_state(&self) -> SyncState {
        self.store.get_state().await
    }

    pub async fn get_sync_config(&self) -> SyncConfig {
        self.store.get_config().await
    }

    /// One-time startup work: re-arm a lost alarm and start the alarm loop.
    ///
    /// Safe to call repeatedly; only the first call does anything. Returns
    /// whether this call performed the initialization.
    pub async fn initialize(self: &Arc<Self>) -> bool {
        if self.initialized.swap(true, Ordering::AcqRel) {
            tracing::debug!("Sync orchestrator already initialized");
            return false;
        }

        let config = self.store.get_config().await;
        if config.enabled {
            match self.alarms.next_due(SYNC_ALARM_NAME).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::info!("Sync enabled but no alarm armed, rescheduling");
                    let mut state = self.store.get_state().await;
                    self.schedule_next_sync(&config, &mut state).await;
                }
                Err(e) => tracing::warn!(error = %e, "Failed to read armed alarm"),
            }
        }

        let this = Arc::clone(self);
        let scheduler = Arc::clone(&self.alarms);
        let interval = ALARM_POLL_INTERVAL;
        tokio::spawn(async move {
            run_alarm_loop(scheduler, interval, move |name| {
                let this = Arc::clone(&this);
                async move {
                    this.on_alarm(&name).await;
                }
            })
            .await;
        });

        tracing::info!(enabled = config.enabled, "Sync orchestrator initialized");
        true
    }

    /// Alarm-fired entry point.
    ///
    /// A refused scheduled run re-arms the alarm so the cadence survives
    /// idle periods. A tripped breaker or disabled sync ends the chain.
    pub async fn on_alarm(&self, name: &str) -> Option<TriggerOutcome> {
        if name != SYNC_ALARM_NAME {
            tracing::debug!(alarm = name, "Ignoring unknown alarm");
            return None;
        }

        let outcome = self.trigger_sync(false).await;
        if let TriggerOutcome::Refused { reason } = &outcome {
            let config = self.store.get_config().await;
            let mut state = self.store.get_state().await;
            if config.enabled && !state.circuit_breaker_tripped {
                tracing::info!(reason = %reason, "Scheduled sync refused, re-arming alarm");
                self.schedule_next_sync(&config, &mut state).await;
            }
        }
        Some(outcome)
    }

    /// Login-detected entry point: the session just became usable.
    ///
    /// Fresh cookies, when the host passes them, replace the client's
    /// credentials before the attempt.
    pub async fn on_login_detected(&self, auth: Option<RemoteAuth>) -> TriggerOutcome {
        if let Some(auth) = auth {
            tracing::info!("Login detected with new session, updating credentials");
            self.client.set_auth(Some(auth)).await;
        } else {
            tracing::info!("Login detected, attempting sync");
        }
        self.trigger_sync(false).await
    }
}
