// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile-Sync Server
//!
//! Periodically pulls profile analytics from the remote API in the
//! background, paced and gated so that traffic stays low and stops on
//! repeated failure.

use profile_sync::{
    config::{Config, StoreBackend},
    db::{FirestoreStore, InMemoryStore, KvStore, StateStore},
    services::{
        outbound::spawn_log_consumer, LocalOutbox, RemoteApiClient, RemoteAuth, StoredAlarms,
    },
    sync::SyncOrchestrator,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Profile-Sync");

    let kv: Arc<dyn KvStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; sync state is lost on restart");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Firestore => Arc::new(
            FirestoreStore::new(&config.gcp_project_id, &config.sync_collection).await?,
        ),
    };

    let auth = match (&config.li_at, &config.jsession_id) {
        (Some(li_at), Some(jsession_id)) => Some(RemoteAuth::from_cookies(li_at, jsession_id)),
        _ => {
            tracing::warn!("No remote session configured; cycles will be refused");
            None
        }
    };
    let client = Arc::new(RemoteApiClient::new(config.remote_api_base_url.clone(), auth));

    let orchestrator = Arc::new(SyncOrchestrator::new(
        StateStore::new(kv.clone()),
        client,
        Arc::new(LocalOutbox::new(kv.clone()).with_consumer(spawn_log_consumer())),
        Arc::new(StoredAlarms::new(kv)),
    ));

    if orchestrator.initialize().await {
        tracing::info!("Sync orchestrator initialized");
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
    });

    // Build router
    let app = profile_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("profile_sync=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
