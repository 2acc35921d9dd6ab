//! Setpoint editor: operator edits reconciled against the status feed

use std::collections::BTreeMap;
use std::sync::RwLock;

use plant_api::{display_value, StatusSnapshot, WriteRequest};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::ConsoleError;
use crate::events::log::EventLog;
use crate::http::plant::PlantApi;
use crate::setpoint::state::{
    parse_setpoint, DisplayedSetpoint, ParameterEntry, PendingClearPolicy, SetpointState,
};
use crate::status::feed::SnapshotObserver;

/// Result of a submit call that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No pending edit; nothing was sent
    NothingPending,
    /// The backend accepted the write
    Written { requested: f64, echoed: Value },
}

/// Derived display row for one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterView {
    pub name: String,
    pub process_value: Option<f64>,
    pub confirmed: Option<f64>,
    pub displayed: Option<DisplayedSetpoint>,
    pub state: SetpointState,
    pub deviating: bool,
}

/// Holds per-parameter reconciliation state.
///
/// Local edits win over polled values until submitted; what happens after a
/// successful submit is set by the [`PendingClearPolicy`].
pub struct SetpointEditor {
    entries: RwLock<BTreeMap<String, ParameterEntry>>,
    policy: PendingClearPolicy,
}

impl SetpointEditor {
    pub fn new(policy: PendingClearPolicy) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> PendingClearPolicy {
        self.policy
    }

    /// Set the operator's pending text for a parameter. Not validated.
    pub fn edit(&self, name: &str, raw: impl Into<String>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(name.to_string()).or_default().edit(raw.into());
    }

    /// Drop the pending edit and show the confirmed value again
    pub fn revert(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get_mut(name) else {
            return false;
        };
        let reverted = entry.revert();
        if entry.is_vacant() {
            entries.remove(name);
        }
        reverted
    }

    pub fn pending(&self, name: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(name)
            .and_then(|entry| entry.pending().map(str::to_string))
    }

    pub fn confirmed(&self, name: &str) -> Option<f64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).and_then(|entry| entry.confirmed)
    }

    /// Pending text if present, else the confirmed setpoint
    pub fn displayed_setpoint(&self, name: &str) -> Option<DisplayedSetpoint> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).and_then(ParameterEntry::displayed)
    }

    pub fn is_deviating(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(name)
            .and_then(ParameterEntry::deviation)
            .unwrap_or(false)
    }

    pub fn view(&self, name: &str) -> Option<ParameterView> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).map(|entry| Self::to_view(name, entry))
    }

    /// Display rows for every known parameter, ordered by name
    pub fn views(&self) -> Vec<ParameterView> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(name, entry)| Self::to_view(name, entry))
            .collect()
    }

    fn to_view(name: &str, entry: &ParameterEntry) -> ParameterView {
        ParameterView {
            name: name.to_string(),
            process_value: entry.process_value,
            confirmed: entry.confirmed,
            displayed: entry.displayed(),
            state: entry.state.clone(),
            deviating: entry.deviation().unwrap_or(false),
        }
    }

    /// Validate and write the pending edit for `name`.
    ///
    /// Every failure is recorded in the event log and the pending text is
    /// kept so the operator can correct it or retry.
    pub async fn submit(
        &self,
        name: &str,
        api: &dyn PlantApi,
        events: &EventLog,
    ) -> Result<SubmitOutcome, ConsoleError> {
        let Some(raw) = self.pending(name) else {
            debug!("Nothing pending for {}, skipping submit", name);
            return Ok(SubmitOutcome::NothingPending);
        };

        let requested = match parse_setpoint(&raw) {
            Ok(value) => value,
            Err(e) => {
                events.error(format!("Invalid setpoint for {name}: \"{raw}\""));
                return Err(e);
            }
        };

        let before = self.confirmed(name);
        info!("Writing {} SP -> {}", name, requested);
        let response = match api
            .write_setpoints(&WriteRequest::single(name, requested))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                events.error(format!("Failed to set {name}: {}", e.operator_detail()));
                return Err(e);
            }
        };

        let Some(echoed) = response.get(name).cloned() else {
            let err = ConsoleError::UnexpectedResponse(format!("no value echoed for {name}"));
            events.error(format!("Failed to set {name}: {}", err.operator_detail()));
            return Err(err);
        };

        events.success(format!("Successfully set {name}: {}", display_value(&echoed)));

        {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = entries.get_mut(name) {
                entry.acknowledge(self.policy, &raw, requested, before, echoed_number(&echoed));
            }
        }

        Ok(SubmitOutcome::Written { requested, echoed })
    }
}

/// The echo as a setpoint, if it is a number or numeric text
fn echoed_number(echoed: &Value) -> Option<f64> {
    match echoed {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_setpoint(text).ok(),
        _ => None,
    }
}

impl SnapshotObserver for SetpointEditor {
    fn observe_snapshot(&self, snapshot: &StatusSnapshot) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        for (name, entry) in entries.iter_mut() {
            if !snapshot.contains_key(name) {
                entry.forget_polled();
            }
        }
        entries.retain(|_, entry| !entry.is_vacant());

        for (name, status) in snapshot {
            entries
                .entry(name.clone())
                .or_default()
                .observe(status.pv, status.sp);
        }
    }
}

impl Default for SetpointEditor {
    fn default() -> Self {
        Self::new(PendingClearPolicy::default())
    }
}
