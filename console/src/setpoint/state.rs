//! Per-parameter setpoint reconciliation

use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;

/// Fraction of the setpoint beyond which the process value counts as deviating
pub const DEVIATION_TOLERANCE: f64 = 0.05;

/// What happens to a pending edit once the backend accepted it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingClearPolicy {
    /// Keep shadowing until the operator reverts or edits again
    Retain,
    /// Trust the echoed value and clear immediately
    ClearOnEcho,
    /// Clear once a polled snapshot reports the written setpoint
    #[default]
    ClearOnPollConfirm,
}

/// Which value a parameter's setpoint field shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SetpointState {
    /// Showing the backend-confirmed setpoint
    Confirmed,
    /// Showing the operator's pending text
    Shadowed {
        pending: String,
        /// Set after a successful submit under [`PendingClearPolicy::ClearOnPollConfirm`]
        #[serde(skip_serializing_if = "Option::is_none")]
        awaiting: Option<Awaiting>,
    },
}

/// What a poll must report before a submitted edit stops shadowing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Awaiting {
    /// The backend echoed a number; wait for exactly that setpoint
    Value(f64),
    /// The echo carried no number (e.g. a clip notice); wait for the
    /// setpoint to reach `requested` or to move away from `from`
    Change { from: Option<f64>, requested: f64 },
}

impl Awaiting {
    fn is_met_by(&self, setpoint: f64) -> bool {
        match self {
            Awaiting::Value(target) => same_setpoint(*target, setpoint),
            Awaiting::Change { from, requested } => {
                same_setpoint(*requested, setpoint)
                    || from.map_or(true, |from| !same_setpoint(from, setpoint))
            }
        }
    }
}

/// Displayed setpoint of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayedSetpoint {
    Pending(String),
    Confirmed(f64),
}

impl DisplayedSetpoint {
    /// Numeric value, if the displayed text parses
    pub fn value(&self) -> Option<f64> {
        match self {
            DisplayedSetpoint::Confirmed(value) => Some(*value),
            DisplayedSetpoint::Pending(raw) => parse_setpoint(raw).ok(),
        }
    }
}

/// Reconciliation state of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub confirmed: Option<f64>,
    pub process_value: Option<f64>,
    pub state: SetpointState,
}

impl ParameterEntry {
    pub fn new() -> Self {
        Self {
            confirmed: None,
            process_value: None,
            state: SetpointState::Confirmed,
        }
    }

    /// Take the latest polled values. A pending edit survives unless it was
    /// submitted and this poll reports the awaited setpoint.
    pub fn observe(&mut self, process_value: f64, setpoint: f64) {
        self.confirmed = Some(setpoint);
        self.process_value = Some(process_value);

        if let SetpointState::Shadowed {
            awaiting: Some(awaiting),
            ..
        } = &self.state
        {
            if awaiting.is_met_by(setpoint) {
                self.state = SetpointState::Confirmed;
            }
        }
    }

    /// The parameter disappeared from the snapshot
    pub fn forget_polled(&mut self) {
        self.confirmed = None;
        self.process_value = None;
    }

    pub fn edit(&mut self, raw: String) {
        self.state = SetpointState::Shadowed {
            pending: raw,
            awaiting: None,
        };
    }

    pub fn revert(&mut self) -> bool {
        let was_shadowed = self.is_shadowed();
        self.state = SetpointState::Confirmed;
        was_shadowed
    }

    pub fn pending(&self) -> Option<&str> {
        match &self.state {
            SetpointState::Shadowed { pending, .. } => Some(pending),
            SetpointState::Confirmed => None,
        }
    }

    pub fn is_shadowed(&self) -> bool {
        matches!(self.state, SetpointState::Shadowed { .. })
    }

    /// Record a successful write of `submitted`. Ignored if the operator
    /// has edited again since.
    ///
    /// `before` is the confirmed setpoint at the time of the write and
    /// `echoed` the backend's echo when it reads as a number.
    pub fn acknowledge(
        &mut self,
        policy: PendingClearPolicy,
        submitted: &str,
        requested: f64,
        before: Option<f64>,
        echoed: Option<f64>,
    ) {
        if self.pending() != Some(submitted) {
            return;
        }

        match policy {
            PendingClearPolicy::Retain => {}
            PendingClearPolicy::ClearOnEcho => {
                if let Some(echoed) = echoed {
                    self.confirmed = Some(echoed);
                }
                self.state = SetpointState::Confirmed;
            }
            PendingClearPolicy::ClearOnPollConfirm => {
                self.state = SetpointState::Shadowed {
                    pending: submitted.to_string(),
                    awaiting: Some(match echoed {
                        Some(value) => Awaiting::Value(value),
                        None => Awaiting::Change {
                            from: before,
                            requested,
                        },
                    }),
                };
            }
        }
    }

    pub fn displayed(&self) -> Option<DisplayedSetpoint> {
        match &self.state {
            SetpointState::Shadowed { pending, .. } => {
                Some(DisplayedSetpoint::Pending(pending.clone()))
            }
            SetpointState::Confirmed => self.confirmed.map(DisplayedSetpoint::Confirmed),
        }
    }

    /// Whether the process value deviates from the displayed setpoint
    pub fn deviation(&self) -> Option<bool> {
        let process_value = self.process_value?;
        let setpoint = self.displayed()?.value()?;
        Some(is_deviating(process_value, setpoint))
    }

    /// Nothing left worth keeping
    pub fn is_vacant(&self) -> bool {
        self.confirmed.is_none() && !self.is_shadowed()
    }
}

impl Default for ParameterEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse operator setpoint text. Non-finite values are rejected.
pub fn parse_setpoint(raw: &str) -> Result<f64, ConsoleError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ConsoleError::Validation(format!(
            "\"{raw}\" is not a valid setpoint"
        ))),
    }
}

/// `|PV - SP| > 5% of |SP|`
pub fn is_deviating(process_value: f64, setpoint: f64) -> bool {
    (process_value - setpoint).abs() > setpoint.abs() * DEVIATION_TOLERANCE
}

fn same_setpoint(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}
