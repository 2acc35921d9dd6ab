//! Application configuration options

use std::time::Duration;

use crate::setpoint::state::PendingClearPolicy;
use crate::storage::settings::Settings;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Plant backend base URL
    pub backend_base_url: String,

    /// Per-request timeout for backend calls
    pub request_timeout: Duration,

    /// Enable the operator API server
    pub enable_server: bool,

    /// Print event log entries to the terminal
    pub echo_events: bool,

    /// Operator API server configuration
    pub server: ServerOptions,

    /// Status poller options
    pub poller: poller::Options,

    /// Pending edit handling after a successful write
    pub pending_clear_policy: PendingClearPolicy,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            enable_server: true,
            echo_events: true,
            server: ServerOptions::default(),
            poller: poller::Options::default(),
            pending_clear_policy: PendingClearPolicy::default(),
            max_shutdown_delay: Duration::from_secs(10),
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            request_timeout: settings.backend.request_timeout(),
            enable_server: settings.enable_server,
            echo_events: settings.echo_events,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            poller: poller::Options {
                backoff: settings.poll_backoff.build(),
                ..Default::default()
            },
            pending_clear_policy: settings.pending_clear_policy,
            ..Default::default()
        }
    }
}

/// Operator API server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
