//! Plant controller API

use async_trait::async_trait;
use plant_api::{
    ControlLoops, ExecuteResponse, Plan, PlanRequest, StatusSnapshot, WriteRequest,
    WriteResponse,
};

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;

/// Backend operations the console core depends on
#[async_trait]
pub trait PlantApi: Send + Sync {
    /// Read the full parameter status snapshot
    async fn fetch_status(&self) -> Result<StatusSnapshot, ConsoleError>;

    /// Write one or more setpoints
    async fn write_setpoints(&self, request: &WriteRequest) -> Result<WriteResponse, ConsoleError>;

    /// Ask the planning service for a plan
    async fn generate_plan(&self, prompt: &str) -> Result<Plan, ConsoleError>;

    /// Execute a plan, returning the per-step log
    async fn execute_plan(&self, plan: &Plan) -> Result<ExecuteResponse, ConsoleError>;

    /// Read the control loop overview
    async fn fetch_control_loops(&self) -> Result<ControlLoops, ConsoleError>;
}

#[async_trait]
impl PlantApi for HttpClient {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ConsoleError> {
        self.get("/status").await
    }

    async fn write_setpoints(&self, request: &WriteRequest) -> Result<WriteResponse, ConsoleError> {
        self.post("/write_multi_real", request).await
    }

    async fn generate_plan(&self, prompt: &str) -> Result<Plan, ConsoleError> {
        let request = PlanRequest {
            prompt: prompt.to_string(),
        };
        self.post("/llm/plan", &request).await
    }

    async fn execute_plan(&self, plan: &Plan) -> Result<ExecuteResponse, ConsoleError> {
        self.post("/execute_plan", plan).await
    }

    async fn fetch_control_loops(&self) -> Result<ControlLoops, ConsoleError> {
        self.get("/control_loops").await
    }
}

/// Fetch the control loop overview for display.
///
/// Informational only: failures become a placeholder status and are not
/// recorded in the event log.
pub async fn fetch_control_loops_view(api: &dyn PlantApi) -> ControlLoops {
    match api.fetch_control_loops().await {
        Ok(loops) => loops,
        Err(e) => {
            tracing::debug!("Control loop fetch failed: {}", e);
            ControlLoops {
                active_loops: Vec::new(),
                status: "Error fetching data.".to_string(),
            }
        }
    }
}
