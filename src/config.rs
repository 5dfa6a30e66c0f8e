//! Process configuration loaded from environment variables.
//!
//! User-facing sync settings are not here; they live in the persisted
//! `SyncConfig` document and change at runtime.

use std::env;

/// Which key-value backend holds the sync documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory. State is lost on restart.
    Memory,
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "firestore" => Ok(StoreBackend::Firestore),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// UI origin allowed by CORS
    pub frontend_url: String,
    /// Base URL of the remote API
    pub remote_api_base_url: String,
    /// Session cookie for the remote API, if already known
    pub li_at: Option<String>,
    /// JSESSIONID cookie for the remote API, if already known
    pub jsession_id: Option<String>,
    /// HS256 key for API bearer tokens (raw bytes)
    pub api_signing_key: Vec<u8>,
    /// Shared secret expected in `x-sync-task-token` on `/tasks/*`
    pub task_token: String,
    pub store_backend: StoreBackend,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,
    /// Firestore collection holding the sync documents
    pub sync_collection: String,
}

impl Config {
    /// Config for tests: in-memory store, fixed secrets.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            remote_api_base_url: "http://127.0.0.1:9".to_string(),
            li_at: None,
            jsession_id: None,
            api_signing_key: b"test_api_key_32_bytes_minimum!!!".to_vec(),
            task_token: "test_task_token".to_string(),
            store_backend: StoreBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            sync_collection: crate::db::firestore::DEFAULT_COLLECTION.to_string(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            remote_api_base_url: env::var("REMOTE_API_BASE_URL")
                .unwrap_or_else(|_| crate::services::remote::DEFAULT_BASE_URL.to_string()),
            li_at: optional_secret("LI_AT"),
            jsession_id: optional_secret("JSESSIONID"),
            api_signing_key: env::var("API_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("API_SIGNING_KEY"))?
                .into_bytes(),
            task_token: env::var("TASK_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TASK_TOKEN"))?,
            store_backend,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            sync_collection: env::var("SYNC_COLLECTION")
                .unwrap_or_else(|_| crate::db::firestore::DEFAULT_COLLECTION.to_string()),
        })
    }
}

/// Trimmed env var, `None` if unset or blank.
fn optional_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
