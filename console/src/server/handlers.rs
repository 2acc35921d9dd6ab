//! Operator API request handlers
//!
//! Thin JSON layer over the core. Failures are already in the event log by the
//! time a handler sees them; handlers only pick a status code.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use plant_api::{ControlLoops, Plan, StatusSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::state::AppState;
use crate::errors::{ConsoleError, ErrorKind};
use crate::events::log::LogEntry;
use crate::http::plant::fetch_control_loops_view;
use crate::plan::engine::{ExecutionReport, PlanSnapshot};
use crate::setpoint::editor::{ParameterView, SubmitOutcome};
use crate::utils::version_info;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a console error onto an HTTP status
pub struct ApiError(ConsoleError);

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match (&self.0, self.0.kind()) {
            (ConsoleError::InvalidTransition(_), _) => StatusCode::CONFLICT,
            (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::Network | ErrorKind::ServerRejection) => StatusCode::BAD_GATEWAY,
            (_, ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.0.operator_detail(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "bioconsole".to_string(),
        version: version_info().version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Parameter table
#[derive(Debug, Serialize)]
pub struct ParametersResponse {
    pub updated_at: Option<DateTime<Utc>>,
    pub status: Arc<StatusSnapshot>,
    pub parameters: Vec<ParameterView>,
}

pub async fn parameters_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ParametersResponse {
        updated_at: state.feed.updated_at(),
        status: state.feed.latest(),
        parameters: state.editor.views(),
    })
}

/// Pending edit body
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub value: String,
}

pub async fn edit_setpoint_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<EditRequest>,
) -> impl IntoResponse {
    state.editor.edit(&name, request.value);
    Json(state.editor.view(&name))
}

#[derive(Debug, Serialize)]
pub struct RevertResponse {
    pub reverted: bool,
}

pub async fn revert_setpoint_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    Json(RevertResponse {
        reverted: state.editor.revert(&name),
    })
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub written: bool,
    pub requested: Option<f64>,
    pub echoed: Option<Value>,
}

pub async fn submit_setpoint_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state
        .editor
        .submit(&name, state.api.as_ref(), &state.events)
        .await?;

    let response = match outcome {
        SubmitOutcome::NothingPending => SubmitResponse {
            written: false,
            requested: None,
            echoed: None,
        },
        SubmitOutcome::Written { requested, echoed } => SubmitResponse {
            written: true,
            requested: Some(requested),
            echoed: Some(echoed),
        },
    };
    Ok(Json(response))
}

pub async fn plan_handler(State(state): State<Arc<AppState>>) -> Json<PlanSnapshot> {
    Json(state.plans.snapshot())
}

/// Plan generation body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

pub async fn generate_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Plan>, ApiError> {
    let plan = state
        .plans
        .generate(&request.prompt, state.api.as_ref(), &state.events)
        .await?;
    Ok(Json(plan))
}

#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub discarded: bool,
}

pub async fn discard_plan_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DiscardResponse>, ApiError> {
    let discarded = state.plans.discard()?;
    Ok(Json(DiscardResponse { discarded }))
}

pub async fn execute_plan_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let report = state
        .plans
        .execute(state.api.as_ref(), &state.events)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<LogEntry>> {
    Json(state.events.since(query.since))
}

pub async fn control_loops_handler(State(state): State<Arc<AppState>>) -> Json<ControlLoops> {
    Json(fetch_control_loops_view(state.api.as_ref()).await)
}
