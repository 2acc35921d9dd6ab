//! API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Full status snapshot, keyed by parameter name (case-sensitive)
pub type StatusSnapshot = BTreeMap<String, ParameterStatus>;

/// Write response: parameter name to the value (or status text) the backend applied
pub type WriteResponse = BTreeMap<String, Value>;

/// Process value and setpoint of one controlled parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterStatus {
    #[serde(rename = "PV")]
    pub pv: f64,

    #[serde(rename = "SP")]
    pub sp: f64,
}

/// Setpoint write request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub values: BTreeMap<String, f64>,
}

impl WriteRequest {
    /// Request writing a single setpoint
    pub fn single(name: impl Into<String>, value: f64) -> Self {
        let mut values = BTreeMap::new();
        values.insert(name.into(), value);
        Self { values }
    }
}

/// Plan generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub prompt: String,
}

/// An opaque plan document produced by the planning service.
///
/// Serializes exactly as received so it can be posted back for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(Value);

impl Plan {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    pub fn document(&self) -> &Value {
        &self.0
    }

    pub fn into_document(self) -> Value {
        self.0
    }
}

/// Successful plan execution response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub log: Vec<StepOutcome>,
}

/// Outcome of one executed plan step, in execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step index as sent by the backend; any JSON number is accepted
    pub step: Number,

    #[serde(default)]
    pub details: Value,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl StepOutcome {
    /// Step index as operator-facing text, `1.0` shown as `1`
    pub fn step_label(&self) -> String {
        display_value(&Value::Number(self.step.clone()))
    }

    /// Step details as operator-facing text
    pub fn details_text(&self) -> String {
        display_value(&self.details)
    }

    /// Whether the backend marked this step as failed
    pub fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("error"))
    }
}

/// Control loop overview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlLoops {
    #[serde(default)]
    pub active_loops: Vec<ControlLoop>,

    #[serde(default)]
    pub status: String,
}

/// A closed-loop controller running on the plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlLoop {
    pub id: Value,
    pub name: String,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

/// Render a JSON value for an operator: numbers in shortest form, strings
/// verbatim, anything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) => float.to_string(),
            None => number.to_string(),
        },
        other => other.to_string(),
    }
}
