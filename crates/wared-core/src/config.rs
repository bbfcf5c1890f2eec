//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default request timeout for outbound API calls, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default subdirectory name for durable client state
pub const DEFAULT_STORAGE_DIR: &str = "wared";

/// Configuration for the Wared client core.
///
/// Constructed once at process start and injected into `AppCore`; no
/// component reads configuration from a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the Wared REST API, e.g. `https://wared.example/api`
    pub api_base_url: String,
    /// Timeout applied to every outbound request
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Directory for durable client state (session token, permission snapshot)
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(DEFAULT_STORAGE_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}

impl AppConfig {
    /// Create a configuration with defaults for everything but the API base
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage_dir: default_storage_dir(),
        }
    }

    /// Override the durable storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}
