//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::ControllerError;
use crate::server::handlers::{
    component_info_handler, deploy_display_handler, deploy_ioc_handler, health_handler,
    initial_deployment_handler, revert_handler, task_report_handler, task_status_handler,
};
use crate::server::state::ServerState;

/// Build the controller's router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_handler))
        // Deployments
        .route("/deployment/ioc", put(deploy_ioc_handler))
        .route("/deployment/display", put(deploy_display_handler))
        .route("/deployment/revert", put(revert_handler))
        .route("/deployment/info", get(component_info_handler))
        // Tasks
        .route("/deployment/{task_id}/status", get(task_status_handler))
        .route("/deployment/{task_id}/report", get(task_report_handler))
        // Registry-only
        .route("/initial/deployment", put(initial_deployment_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ControllerError>>, ControllerError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ControllerError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ControllerError::ServerError(e.to_string()))
    });

    Ok(handle)
}
