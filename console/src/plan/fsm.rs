//! Finite state machine for the draft plan slot

use plant_api::Plan;
use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;

/// Plan slot state. The plan lives inside the variant, so "executing with no
/// plan" cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanState {
    /// No plan held
    Idle,

    /// Generation in flight; `prior` is restored if it fails
    Drafting { prior: Option<Plan> },

    /// Plan held for operator review
    Draft(Plan),

    /// Plan locked while the backend executes it
    Executing(Plan),
}

impl PlanState {
    pub fn phase(&self) -> PlanPhase {
        match self {
            PlanState::Idle => PlanPhase::Idle,
            PlanState::Drafting { .. } => PlanPhase::Drafting,
            PlanState::Draft(_) => PlanPhase::Draft,
            PlanState::Executing(_) => PlanPhase::Executing,
        }
    }

    /// The plan under review or under execution
    pub fn plan(&self) -> Option<&Plan> {
        match self {
            PlanState::Draft(plan) | PlanState::Executing(plan) => Some(plan),
            PlanState::Idle | PlanState::Drafting { .. } => None,
        }
    }
}

/// State tag without the plan body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPhase {
    Idle,
    Drafting,
    Draft,
    Executing,
}

/// Plan slot event
#[derive(Debug, Clone)]
pub enum PlanEvent {
    /// A generation request is about to be issued
    Generate,

    /// The planning service returned a plan
    Generated(Plan),

    /// The generation request failed
    GenerationFailed,

    /// Operator discarded the draft
    Discard,

    /// An execution request is about to be issued
    Execute,

    /// The execution request finished, successfully or not
    ExecutionFinished,
}

impl PlanEvent {
    fn name(&self) -> &'static str {
        match self {
            PlanEvent::Generate => "generate",
            PlanEvent::Generated(_) => "generated",
            PlanEvent::GenerationFailed => "generation failed",
            PlanEvent::Discard => "discard",
            PlanEvent::Execute => "execute",
            PlanEvent::ExecutionFinished => "execution finished",
        }
    }
}

/// Plan slot FSM
#[derive(Debug, Clone)]
pub struct PlanFsm {
    state: PlanState,
}

impl PlanFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: PlanState::Idle,
        }
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    /// Process an event and transition state. An invalid transition leaves
    /// the state untouched.
    pub fn process(&mut self, event: PlanEvent) -> Result<(), ConsoleError> {
        let current = std::mem::replace(&mut self.state, PlanState::Idle);
        let event_name = event.name();

        let next = match (current, event) {
            // Generation
            (PlanState::Idle, PlanEvent::Generate) => PlanState::Drafting { prior: None },
            (PlanState::Draft(plan), PlanEvent::Generate) => PlanState::Drafting {
                prior: Some(plan),
            },
            (PlanState::Drafting { .. }, PlanEvent::Generated(plan)) => PlanState::Draft(plan),
            (PlanState::Drafting { prior }, PlanEvent::GenerationFailed) => match prior {
                Some(plan) => PlanState::Draft(plan),
                None => PlanState::Idle,
            },

            // Discard; idempotent from Idle
            (PlanState::Draft(_), PlanEvent::Discard) => PlanState::Idle,
            (PlanState::Idle, PlanEvent::Discard) => PlanState::Idle,

            // Execution
            (PlanState::Draft(plan), PlanEvent::Execute) => PlanState::Executing(plan),
            (PlanState::Executing(_), PlanEvent::ExecutionFinished) => PlanState::Idle,

            // Invalid transitions
            (state, _) => {
                let phase = state.phase();
                self.state = state;
                return Err(ConsoleError::InvalidTransition(format!(
                    "cannot {} while {:?}",
                    event_name, phase
                )));
            }
        };

        self.state = next;
        Ok(())
    }
}

impl Default for PlanFsm {
    fn default() -> Self {
        Self::new()
    }
}
