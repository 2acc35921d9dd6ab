//! Diagnostic logging configuration

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::ConsoleError;
use crate::storage::settings::Settings;

/// Crates whose diagnostics follow the configured level
const CONSOLE_TARGETS: [&str; 2] = ["bioconsole", "plant_api"];

/// Verbosity of the console's own diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Level for operator API request spans, which stay quiet unless debugging
    fn http_level(&self) -> &'static str {
        match self {
            LogLevel::Trace | LogLevel::Debug => self.as_str(),
            _ => "warn",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
            .map_err(|_| ConsoleError::ConfigError(format!("invalid log level \"{s}\"")))
    }
}

/// Logging options, taken from the settings file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogOptions {
    pub log_level: LogLevel,

    /// Emit JSON lines instead of the human-readable format
    pub json_format: bool,
}

impl LogOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            log_level: settings.log_level,
            json_format: settings.log_json,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset. Dependencies stay at
    /// `warn`; the console crates follow `log_level`.
    pub fn directives(&self) -> String {
        let level = self.log_level.as_str();
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            CONSOLE_TARGETS
                .iter()
                .map(|target| format!("{target}={level}")),
        );
        directives.push(format!("tower_http={}", self.log_level.http_level()));
        directives.join(",")
    }
}

/// Initialize diagnostic logging. `RUST_LOG` takes precedence over the settings.
pub fn init_logging(options: &LogOptions) -> Result<(), ConsoleError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(options.directives())
            .map_err(|e| ConsoleError::ConfigError(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if options.json_format {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    result.map_err(|e| ConsoleError::ConfigError(e.to_string()))
}
