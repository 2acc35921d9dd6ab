//! Operator API server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::app::state::AppState;
use crate::errors::ConsoleError;
use crate::server::handlers::{
    control_loops_handler, discard_plan_handler, edit_setpoint_handler, events_handler,
    execute_plan_handler, generate_plan_handler, health_handler, parameters_handler,
    plan_handler, revert_setpoint_handler, submit_setpoint_handler, version_handler,
};

/// Build the operator API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Setpoints
        .route("/parameters", get(parameters_handler))
        .route(
            "/parameters/{name}/pending",
            put(edit_setpoint_handler).delete(revert_setpoint_handler),
        )
        .route("/parameters/{name}/submit", post(submit_setpoint_handler))
        // Plans
        .route(
            "/plan",
            get(plan_handler)
                .post(generate_plan_handler)
                .delete(discard_plan_handler),
        )
        .route("/plan/execute", post(execute_plan_handler))
        // Read-only panels
        .route("/events", get(events_handler))
        .route("/control_loops", get(control_loops_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the operator API server, returning the bound address
pub async fn serve(
    options: &ServerOptions,
    state: Arc<AppState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, JoinHandle<Result<(), ConsoleError>>), ConsoleError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ConsoleError::ServerError(format!("{addr}: {e}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ConsoleError::ServerError(e.to_string()))?;
    info!("Operator API listening on {}", local_addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ConsoleError::ServerError(e.to_string()))
    });

    Ok((local_addr, handle))
}
