//! Settings file management

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::errors::ConsoleError;
use crate::logs::LogLevel;
use crate::setpoint::state::PendingClearPolicy;
use crate::status::backoff::BackoffKind;

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "bioconsole.json";

/// Console settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit diagnostics as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Plant backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Operator API server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Enable the operator API server
    #[serde(default = "default_true")]
    pub enable_server: bool,

    /// Print event log entries to the terminal
    #[serde(default = "default_true")]
    pub echo_events: bool,

    /// What a successful setpoint write does to the pending edit
    #[serde(default)]
    pub pending_clear_policy: PendingClearPolicy,

    /// Status poll backoff strategy
    #[serde(default)]
    pub poll_backoff: BackoffKind,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            backend: BackendSettings::default(),
            server: ServerSettings::default(),
            enable_server: true,
            echo_events: true,
            pending_clear_policy: PendingClearPolicy::default(),
            poll_backoff: BackoffKind::default(),
        }
    }
}

/// Plant backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the plant controller API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Operator API server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Load settings from a JSON file. A missing file yields the defaults.
pub async fn load_settings(path: &Path) -> Result<Settings, ConsoleError> {
    match fs::read_to_string(path).await {
        Ok(contents) => {
            let settings = serde_json::from_str(&contents).map_err(|e| {
                ConsoleError::ConfigError(format!("{}: {}", path.display(), e))
            })?;
            Ok(settings)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No settings file at {}, using defaults", path.display());
            Ok(Settings::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Settings file path: `--settings=<path>` or the default
pub fn settings_path(cli_value: Option<&str>) -> PathBuf {
    PathBuf::from(cli_value.unwrap_or(DEFAULT_SETTINGS_FILE))
}
