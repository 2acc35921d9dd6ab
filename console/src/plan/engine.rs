//! Plan engine: generate, review, execute

use std::sync::Mutex;

use plant_api::{Plan, StepOutcome};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::ConsoleError;
use crate::events::log::EventLog;
use crate::http::plant::PlantApi;
use crate::plan::fsm::{PlanEvent, PlanFsm, PlanPhase, PlanState};

/// Steps reported by a successful execution, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub message: Option<String>,
    pub steps: Vec<StepOutcome>,
}

/// Serializable view of the plan slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSnapshot {
    pub phase: PlanPhase,
    pub plan: Option<Plan>,
}

/// Owns the single draft plan slot.
///
/// Every transition is checked and applied under one lock, which is never
/// held across a backend call.
pub struct PlanEngine {
    fsm: Mutex<PlanFsm>,
}

impl PlanEngine {
    pub fn new() -> Self {
        Self {
            fsm: Mutex::new(PlanFsm::new()),
        }
    }

    pub fn phase(&self) -> PlanPhase {
        let fsm = self.fsm.lock().unwrap_or_else(|e| e.into_inner());
        fsm.state().phase()
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        let fsm = self.fsm.lock().unwrap_or_else(|e| e.into_inner());
        PlanSnapshot {
            phase: fsm.state().phase(),
            plan: fsm.state().plan().cloned(),
        }
    }

    fn process(&self, event: PlanEvent) -> Result<(), ConsoleError> {
        let mut fsm = self.fsm.lock().unwrap_or_else(|e| e.into_inner());
        fsm.process(event).inspect_err(|e| warn!("Plan request rejected: {}", e))
    }

    /// Request a plan for `prompt`, replacing any current draft on success
    pub async fn generate(
        &self,
        prompt: &str,
        api: &dyn PlantApi,
        events: &EventLog,
    ) -> Result<Plan, ConsoleError> {
        if prompt.trim().is_empty() {
            return Err(ConsoleError::Validation("prompt is empty".to_string()));
        }

        self.process(PlanEvent::Generate)?;
        info!("Generating plan for: \"{}\"", prompt);

        let guard = Abandoned::arm(
            self,
            events,
            PlanEvent::GenerationFailed,
            "Failed to generate plan: request cancelled",
        );
        let result = api.generate_plan(prompt).await;
        guard.disarm();

        match result {
            Ok(plan) => {
                self.process(PlanEvent::Generated(plan.clone()))?;
                events.success("Plan generated successfully.");
                Ok(plan)
            }
            Err(e) => {
                self.process(PlanEvent::GenerationFailed)?;
                events.error(format!("Failed to generate plan: {}", e.operator_detail()));
                Err(e)
            }
        }
    }

    /// Drop the draft. Returns `false` if there was nothing to discard.
    pub fn discard(&self) -> Result<bool, ConsoleError> {
        let mut fsm = self.fsm.lock().unwrap_or_else(|e| e.into_inner());
        let had_draft = matches!(fsm.state(), PlanState::Draft(_));
        fsm.process(PlanEvent::Discard)
            .inspect_err(|e| warn!("Plan request rejected: {}", e))?;
        if had_draft {
            info!("Draft plan discarded");
        }
        Ok(had_draft)
    }

    /// Execute the draft. The plan is cleared whatever the outcome.
    pub async fn execute(
        &self,
        api: &dyn PlantApi,
        events: &EventLog,
    ) -> Result<ExecutionReport, ConsoleError> {
        let plan = {
            let mut fsm = self.fsm.lock().unwrap_or_else(|e| e.into_inner());
            fsm.process(PlanEvent::Execute)
                .inspect_err(|e| warn!("Plan request rejected: {}", e))?;
            match fsm.state() {
                PlanState::Executing(plan) => plan.clone(),
                other => {
                    return Err(ConsoleError::Internal(format!(
                        "expected executing state, found {:?}",
                        other.phase()
                    )))
                }
            }
        };

        info!("Executing plan...");
        let guard = Abandoned::arm(
            self,
            events,
            PlanEvent::ExecutionFinished,
            "Plan execution failed: request cancelled",
        );
        let result = api.execute_plan(&plan).await;
        guard.disarm();
        self.process(PlanEvent::ExecutionFinished)?;

        match result {
            Ok(response) => {
                for step in &response.log {
                    events.info(step_message(step));
                }
                events.success("Plan executed successfully.");
                Ok(ExecutionReport {
                    message: response.message,
                    steps: response.log,
                })
            }
            Err(e) => {
                for step in e.partial_steps().iter().filter(|step| !step.is_error()) {
                    events.info(step_message(step));
                }
                events.error(format!("Plan execution failed: {}", e.operator_detail()));
                Err(e)
            }
        }
    }
}

impl Default for PlanEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes an in-flight request if its future is dropped before the backend
/// answers. The slot must not stay in `Drafting` or `Executing`.
struct Abandoned<'a> {
    engine: &'a PlanEngine,
    events: &'a EventLog,
    closing: Option<(PlanEvent, &'static str)>,
}

impl<'a> Abandoned<'a> {
    fn arm(
        engine: &'a PlanEngine,
        events: &'a EventLog,
        event: PlanEvent,
        message: &'static str,
    ) -> Self {
        Self {
            engine,
            events,
            closing: Some((event, message)),
        }
    }

    fn disarm(mut self) {
        self.closing = None;
    }
}

impl Drop for Abandoned<'_> {
    fn drop(&mut self) {
        if let Some((event, message)) = self.closing.take() {
            warn!("Plan request dropped before the backend answered");
            if self.engine.process(event).is_ok() {
                self.events.error(message);
            }
        }
    }
}

fn step_message(step: &StepOutcome) -> String {
    format!("Step {}: {}", step.step_label(), step.details_text())
}
