//! Error types for the operator console

use http::StatusCode;
use plant_api::{display_value, StepOutcome};
use serde_json::Value;
use thiserror::Error;

/// Main error type for the console
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend rejected request ({status}){}", .detail.suffix())]
    Rejected {
        status: StatusCode,
        detail: ServerDetail,
    },

    #[error("Unexpected backend response: {0}")]
    UnexpectedResponse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Operator-level classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not complete
    Network,
    /// Locally invalid input, or an operation not allowed right now
    Validation,
    /// The backend answered with an error
    ServerRejection,
    /// Plumbing failures that are not the operator's concern
    Internal,
}

impl ConsoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConsoleError::Network(_) => ErrorKind::Network,
            ConsoleError::Rejected { .. } | ConsoleError::UnexpectedResponse(_) => {
                ErrorKind::ServerRejection
            }
            ConsoleError::Validation(_) | ConsoleError::InvalidTransition(_) => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Internal,
        }
    }

    /// The most specific failure text available for the event log.
    ///
    /// A backend-provided detail wins over the transport-level description.
    pub fn operator_detail(&self) -> String {
        match self {
            ConsoleError::Rejected { status, detail } => match detail {
                ServerDetail::Message(message) => message.clone(),
                ServerDetail::StepLog(steps) => steps
                    .iter()
                    .rev()
                    .find(|step| step.is_error())
                    .or_else(|| steps.last())
                    .map(|step| step.details_text())
                    .unwrap_or_else(|| status.to_string()),
                ServerDetail::Other(value) => display_value(value),
                ServerDetail::None => status.to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Steps the backend reports as attempted before a failure, if any
    pub fn partial_steps(&self) -> &[StepOutcome] {
        match self {
            ConsoleError::Rejected {
                detail: ServerDetail::StepLog(steps),
                ..
            } => steps,
            _ => &[],
        }
    }
}

/// The `detail` member of an error response body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ServerDetail {
    /// Human-readable detail text
    Message(String),
    /// Step log of a partially executed plan
    StepLog(Vec<StepOutcome>),
    /// Some other structured detail
    Other(Value),
    #[default]
    None,
}

impl ServerDetail {
    /// Classify a `detail` value taken from an error body
    pub fn from_value(detail: Option<Value>) -> Self {
        match detail {
            None | Some(Value::Null) => ServerDetail::None,
            Some(Value::String(message)) => ServerDetail::Message(message),
            Some(value) => {
                let steps = value
                    .get("log")
                    .cloned()
                    .and_then(|log| serde_json::from_value::<Vec<StepOutcome>>(log).ok());
                match steps {
                    Some(steps) => ServerDetail::StepLog(steps),
                    None => ServerDetail::Other(value),
                }
            }
        }
    }

    fn suffix(&self) -> String {
        match self {
            ServerDetail::Message(message) => format!(": {message}"),
            ServerDetail::StepLog(steps) => format!(": {} step(s) reported", steps.len()),
            ServerDetail::Other(value) => format!(": {value}"),
            ServerDetail::None => String::new(),
        }
    }
}
