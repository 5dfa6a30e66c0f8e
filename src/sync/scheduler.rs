// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Next-wake computation and configuration lifecycle.

use super::safety;
use super::SyncOrchestrator;
use crate::models::{SyncConfig, SyncConfigPatch, SyncState};
use crate::services::alarms::SYNC_ALARM_NAME;
use chrono::Duration;
use rand::Rng;

const MINUTE_MS: i64 = 60 * 1000;

/// Delay until the next cycle: `base * multiplier + uniform(0, jitter)`.
pub fn next_sync_delay<R: Rng + ?Sized>(
    config: &SyncConfig,
    consecutive_failures: u32,
    rng: &mut R,
) -> Duration {
    let multiplier = i64::from(safety::backoff_multiplier(consecutive_failures));
    let base_ms = i64::from(config.base_interval_minutes) * MINUTE_MS * multiplier;
    let jitter_span = i64::from(config.jitter_minutes) * MINUTE_MS;
    let jitter_ms = if jitter_span > 0 {
        rng.gen_range(0..jitter_span)
    } else {
        0
    };
    Duration::milliseconds(base_ms + jitter_ms)
}

impl SyncOrchestrator {
    /// Arm the next wake and persist `next_sync_time` into `state`.
    ///
    /// Returns the computed next sync time (ms).
    pub async fn schedule_next_sync(&self, config: &SyncConfig, state: &mut SyncState) -> i64 {
        let delay = next_sync_delay(config, state.consecutive_failures, &mut rand::thread_rng());
        let next = crate::time_utils::now_millis() + delay.num_milliseconds();

        if let Err(e) = self.alarms.clear(SYNC_ALARM_NAME).await {
            tracing::warn!(error = %e, "Failed to clear sync alarm");
        }
        if let Err(e) = self.alarms.create(SYNC_ALARM_NAME, delay).await {
            tracing::error!(error = %e, "Failed to arm sync alarm");
        }

        state.next_sync_time = Some(next);
        self.store.save_state(state).await;

        tracing::info!(
            next_sync = crate::time_utils::format_millis_rfc3339(next).unwrap_or_default(),
            multiplier = safety::backoff_multiplier(state.consecutive_failures),
            "Next sync scheduled"
        );
        next
    }

    /// Turn background sync on, applying `overrides` first.
    pub async fn enable(&self, overrides: &SyncConfigPatch) -> SyncConfig {
        let mut config = self.store.get_config().await;
        config.merge(overrides);
        config.enabled = true;
        self.store.save_config(&config).await;

        let mut state = self.store.get_state().await;
        state.enabled = true;
        self.schedule_next_sync(&config, &mut state).await;

        tracing::info!("Background sync enabled");
        config
    }

    pub async fn disable(&self) -> SyncConfig {
        let mut config = self.store.get_config().await;
        config.enabled = false;
        self.store.save_config(&config).await;
        self.stop_schedule().await;

        tracing::info!("Background sync disabled");
        config
    }

    /// Mark state disabled, clear the next wake, and disarm the alarm.
    async fn stop_schedule(&self) {
        let mut state = self.store.get_state().await;
        state.enabled = false;
        state.next_sync_time = None;
        self.store.save_state(&state).await;

        if let Err(e) = self.alarms.clear(SYNC_ALARM_NAME).await {
            tracing::warn!(error = %e, "Failed to clear sync alarm");
        }
    }

    /// Merge `patch` into the config, then reschedule or stop accordingly.
    pub async fn update_config(&self, patch: &SyncConfigPatch) -> SyncConfig {
        let mut config = self.store.get_config().await;
        config.merge(patch);
        self.store.save_config(&config).await;

        if config.enabled {
            let mut state = self.store.get_state().await;
            state.enabled = true;
            self.schedule_next_sync(&config, &mut state).await;
        } else {
            self.stop_schedule().await;
        }
        config
    }

    /// Operator recovery after the underlying failure is fixed.
    pub async fn reset_circuit_breaker(&self) -> SyncState {
        let mut state = self.store.get_state().await;
        state.circuit_breaker_tripped = false;
        state.consecutive_failures = 0;
        state.last_error = None;
        self.store.save_state(&state).await;

        let config = self.store.get_config().await;
        if config.enabled {
            self.schedule_next_sync(&config, &mut state).await;
        }
        tracing::info!("Circuit breaker reset");
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::alarms::AlarmScheduler;
    use crate::sync::testing::Harness;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delay_applies_multiplier_then_jitter() {
        let config = SyncConfig {
            base_interval_minutes: 60,
            jitter_minutes: 10,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        for (failures, multiplier) in [(0, 1), (1, 2), (2, 4), (5, 6)] {
            let delay = next_sync_delay(&config, failures, &mut rng);
            let base = Duration::minutes(60 * multiplier);
            assert!(delay >= base, "failures={}", failures);
            assert!(delay < base + Duration::minutes(10), "failures={}", failures);
        }
    }

    #[test]
    fn test_zero_jitter() {
        let config = SyncConfig {
            base_interval_minutes: 45,
            jitter_minutes: 0,
            ..Default::default()
        };
        let delay = next_sync_delay(&config, 0, &mut StdRng::seed_from_u64(1));
        assert_eq!(delay, Duration::minutes(45));
    }

    #[tokio::test]
    async fn test_enable_disable_round_trip() {
        let h = Harness::new();
        let patch = SyncConfigPatch {
            base_interval_minutes: Some(90),
            enabled: Some(false),
            ..Default::default()
        };

        let config = h.orchestrator.enable(&patch).await;
        assert!(config.enabled);
        assert_eq!(config.base_interval_minutes, 90);

        let state = h.store.get_state().await;
        assert!(state.enabled);
        assert!(state.next_sync_time.is_some());
        assert!(h.alarms.next_due(SYNC_ALARM_NAME).await.unwrap().is_some());

        h.orchestrator.disable().await;
        let state = h.store.get_state().await;
        assert!(!state.enabled);
        assert_eq!(state.next_sync_time, None);
        assert!(!h.store.get_config().await.enabled);
        assert!(h.alarms.next_due(SYNC_ALARM_NAME).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_config_that_disables_stops_schedule() {
        let h = Harness::enabled().await;
        h.orchestrator.enable(&SyncConfigPatch::default()).await;

        let patch = SyncConfigPatch {
            enabled: Some(false),
            ..Default::default()
        };
        h.orchestrator.update_config(&patch).await;

        assert!(h.alarms.next_due(SYNC_ALARM_NAME).await.unwrap().is_none());
        assert_eq!(h.store.get_state().await.next_sync_time, None);
    }

    #[tokio::test]
    async fn test_reset_breaker_clears_and_reschedules() {
        let h = Harness::enabled().await;
        h.update_state(|s| {
            s.circuit_breaker_tripped = true;
            s.consecutive_failures = 5;
            s.last_error = Some("analytics: HTTP 500".into());
        })
        .await;

        let state = h.orchestrator.reset_circuit_breaker().await;

        assert!(!state.circuit_breaker_tripped);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.last_error, None);
        assert!(state.next_sync_time.is_some());
        assert_eq!(h.store.get_state().await, state);
    }
}
