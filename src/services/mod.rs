// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - collaborators of the sync orchestrator.

pub mod alarms;
pub mod endpoint;
pub mod outbound;
pub mod remote;

pub use alarms::{AlarmScheduler, StoredAlarms};
pub use endpoint::{EndpointClient, EndpointResponse, RemoteAuth};
pub use outbound::{LocalOutbox, OutboundSync};
pub use remote::RemoteApiClient;
