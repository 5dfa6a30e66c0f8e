// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One end-to-end sync cycle.
//!
//! Endpoints are fetched strictly one after another with a randomized
//! pause in between. A failing endpoint is recorded and the loop moves on;
//! only the aggregate outcome touches the failure counters.

use super::safety;
use super::SyncOrchestrator;
use crate::models::{EndpointType, HistoryEntry, ProfileIdentifiers, SyncConfig, SyncState};
use crate::processors::{self, ProcessorContext};
use crate::time_utils::now_millis;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Bounds of the random pause before each endpoint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacing {
    pub min: Duration,
    pub max: Duration,
}

impl Default for RequestPacing {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1000),
            max: Duration::from_millis(4000),
        }
    }
}

impl RequestPacing {
    /// No pause at all.
    pub const NONE: RequestPacing = RequestPacing {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Uniform draw from `[min, max)`, or `min` when the range is empty.
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..max))
    }
}

/// What a trigger request did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TriggerOutcome {
    /// A cycle was already in progress; nothing was done.
    AlreadyRunning,
    /// The precondition gate refused.
    Refused { reason: String },
    Completed { entry: HistoryEntry },
}

/// Clears the reentrancy flag on drop.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Endpoints to fetch this cycle.
///
/// Enabled endpoints whose identifiers are available, least recently
/// synced first (never synced first of all), capped at the per-cycle limit.
pub fn select_endpoints(
    config: &SyncConfig,
    state: &SyncState,
    ids: &ProfileIdentifiers,
) -> Vec<EndpointType> {
    let mut selected: Vec<EndpointType> = config
        .enabled_endpoints()
        .into_iter()
        .filter(|e| !e.requires_profile_urn() || ids.profile_urn.is_some())
        .filter(|e| !e.requires_public_identifier() || ids.public_identifier.is_some())
        .collect();

    selected.sort_by_key(|e| state.endpoint_last_sync_or_zero(*e));
    selected.truncate(config.max_api_calls_per_sync as usize);
    selected
}

impl SyncOrchestrator {
    /// Entry point for every wake source.
    ///
    /// A request while a cycle runs is dropped, not queued.
    pub async fn trigger_sync(&self, manual: bool) -> TriggerOutcome {
        if self.is_running() {
            tracing::info!(manual, "Sync already in progress, skipping");
            return TriggerOutcome::AlreadyRunning;
        }

        let decision = self.should_sync_now(manual).await;
        if !decision.can_sync {
            let reason = decision.reason.unwrap_or_default();
            tracing::info!(manual, reason = %reason, "Sync not permitted");
            return TriggerOutcome::Refused { reason };
        }

        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::info!(manual, "Sync already in progress, skipping");
            return TriggerOutcome::AlreadyRunning;
        };

        tracing::info!(manual, "Starting sync cycle");
        let entry = self.execute_sync_cycle().await;
        TriggerOutcome::Completed { entry }
    }

    /// Bootstrap identifiers from the current-user endpoint when none are stored.
    async fn resolve_identifiers(&self, ctx: &ProcessorContext<'_>) -> ProfileIdentifiers {
        let ids = self.store.profile_identifiers().await;
        if !ids.is_empty() {
            return ids;
        }

        tracing::info!("No stored profile identifiers, fetching current user");
        let response = self.client.fetch_current_user_profile().await;
        match (response.success, response.data) {
            (true, Some(data)) => {
                processors::profile::process(ctx, &data).await;
                self.store.profile_identifiers().await
            }
            _ => {
                tracing::warn!(
                    status = response.status,
                    error = ?response.error,
                    "Current user bootstrap failed"
                );
                ids
            }
        }
    }

    /// Run one cycle and return its history entry.
    ///
    /// Always persists state before returning, and reschedules unless sync
    /// was disabled while the cycle ran.
    pub async fn execute_sync_cycle(&self) -> HistoryEntry {
        let started = now_millis();
        let ctx = ProcessorContext::new(&self.store, self.outbound.as_ref());

        let ids = self.resolve_identifiers(&ctx).await;
        let config = self.store.get_config().await;
        let state = self.store.get_state().await;
        let selected = select_endpoints(&config, &state, &ids);

        if selected.is_empty() {
            tracing::info!("No feasible endpoints this cycle");
            return self.finish_cycle(started, CycleResults::default()).await;
        }

        let mut results = CycleResults {
            selected: selected.clone(),
            ..Default::default()
        };

        for endpoint in selected {
            tokio::time::sleep(self.pacing.sample()).await;

            let response = self
                .client
                .fetch_endpoint(
                    endpoint,
                    ids.profile_urn.as_deref(),
                    ids.public_identifier.as_deref(),
                )
                .await;
            results.api_calls += 1;

            let succeeded = if response.success {
                if let Some(data) = &response.data {
                    processors::process(endpoint, &ctx, data).await;
                }
                true
            } else if response.is_not_found() && endpoint.is_creator_only() {
                tracing::info!(endpoint = %endpoint, "Creator-only endpoint unavailable for this account");
                true
            } else {
                let message = format!("{}: {}", endpoint, response.error_message());
                tracing::warn!(endpoint = %endpoint, status = response.status, error = %message, "Endpoint fetch failed");
                results.errors.push(message);
                false
            };

            results.outcomes.push((endpoint, succeeded, now_millis()));
        }

        let entry = self.finish_cycle(started, results).await;

        let report = self.outbound.process_pending_changes().await;
        tracing::info!(
            outbound_sent = report.success,
            outbound_failed = report.failed,
            "Processed outbound changes"
        );
        entry
    }

    /// Fold a cycle's results into freshly read state, persist, reschedule.
    ///
    /// Config and state are re-read here so that changes made while the
    /// cycle was fetching (disable, breaker reset, config edits) survive.
    async fn finish_cycle(&self, started: i64, results: CycleResults) -> HistoryEntry {
        let config = self.store.get_config().await;
        let mut state = self.store.get_state().await;

        for (endpoint, succeeded, at) in &results.outcomes {
            if *succeeded {
                state.endpoint_last_sync.insert(*endpoint, *at);
            }
            state.endpoint_last_success.insert(*endpoint, *succeeded);
        }

        let all_succeeded = results.outcomes.iter().all(|(_, ok, _)| *ok);
        let any_succeeded = results.outcomes.iter().any(|(_, ok, _)| *ok);

        if results.outcomes.is_empty() {
            // No-op cycle, counters untouched
        } else if all_succeeded {
            state.consecutive_failures = 0;
            state.last_error = None;
        } else if !any_succeeded {
            state.consecutive_failures += 1;
            state.last_error = results.errors.first().cloned();
            if safety::should_trip_breaker(
                state.consecutive_failures,
                config.max_consecutive_failures,
            ) {
                state.circuit_breaker_tripped = true;
                tracing::error!(
                    consecutive_failures = state.consecutive_failures,
                    last_error = ?state.last_error,
                    "Circuit breaker tripped"
                );
            }
        } else {
            state.consecutive_failures = 0;
            state.last_error = results.errors.first().cloned();
        }

        let entry = HistoryEntry {
            timestamp: started,
            endpoints_fetched: results.selected,
            success: all_succeeded,
            errors: results.errors,
            duration: now_millis() - started,
            api_call_count: results.api_calls,
        };

        state.last_sync_time = Some(started);
        state.last_sync_success = all_succeeded;
        state.total_syncs += 1;
        state.total_api_calls += u64::from(results.api_calls);
        state.push_history(entry.clone());
        self.store.save_state(&state).await;

        tracing::info!(
            success = entry.success,
            api_calls = entry.api_call_count,
            errors = entry.errors.len(),
            duration_ms = entry.duration,
            "Sync cycle finished"
        );

        if config.enabled {
            self.schedule_next_sync(&config, &mut state).await;
        } else {
            tracing::info!("Sync disabled during cycle, not rescheduling");
        }
        entry
    }
}

/// Per-endpoint results gathered while a cycle runs.
#[derive(Debug, Default)]
struct CycleResults {
    selected: Vec<EndpointType>,
    /// (endpoint, succeeded, finished at ms)
    outcomes: Vec<(EndpointType, bool, i64)>,
    errors: Vec<String>,
    api_calls: u32,
}
