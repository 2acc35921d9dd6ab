//! Application state

use std::sync::Arc;

use tracing::info;

use crate::events::log::EventLog;
use crate::http::plant::PlantApi;
use crate::plan::engine::PlanEngine;
use crate::setpoint::editor::SetpointEditor;
use crate::setpoint::state::PendingClearPolicy;
use crate::status::feed::StatusFeed;

/// Core components shared by the workers and the operator API
pub struct AppState {
    /// Plant backend
    pub api: Arc<dyn PlantApi>,

    /// Operator event log
    pub events: Arc<EventLog>,

    /// Latest polled status
    pub feed: Arc<StatusFeed>,

    /// Pending setpoint edits
    pub editor: Arc<SetpointEditor>,

    /// Draft plan slot
    pub plans: Arc<PlanEngine>,
}

impl AppState {
    /// Wire the core components. The editor observes every applied snapshot.
    pub fn new(api: Arc<dyn PlantApi>, pending_clear_policy: PendingClearPolicy) -> Self {
        info!("Initializing application state...");

        let events = Arc::new(EventLog::new());
        let feed = Arc::new(StatusFeed::new());
        let editor = Arc::new(SetpointEditor::new(pending_clear_policy));
        feed.add_observer(editor.clone());

        Self {
            api,
            events,
            feed,
            editor,
            plans: Arc::new(PlanEngine::new()),
        }
    }

    /// Stop accepting status updates
    pub fn shutdown(&self) {
        info!("Shutting down application state...");
        self.feed.tear_down();
    }
}
