//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use openapi_client::{ComponentRecord, DeploymentHistoryEntry};
use openapi_server::{
    ComponentInfoQuery, ComponentInfoResponse, DisplayDeploymentBody, ErrorResponse,
    HealthResponse, InitialDeploymentBody, InitialDeploymentResponse, IocDeploymentBody,
    RevertBody, TaskAcceptedResponse, TaskStatusResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::deploy::classifier::classify;
use crate::deploy::executor::DeploymentJob;
use crate::deploy::fsm::TaskStatus;
use crate::deploy::revert::plan_revert;
use crate::errors::ControllerError;
use crate::filesys::file::File;
use crate::models::request::DeploymentRequest;
use crate::registry::find_component;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Error returned by handlers, rendered as `{error, message}`
#[derive(Debug)]
pub struct ApiError(pub ControllerError);

impl From<ControllerError> for ApiError {
    fn from(error: ControllerError) -> Self {
        Self(error)
    }
}

/// HTTP status for a controller error
pub fn error_to_status(error: &ControllerError) -> StatusCode {
    match error {
        ControllerError::ValidationError(_)
        | ControllerError::ArtifactNotFound(_)
        | ControllerError::Conflict(_) => StatusCode::BAD_REQUEST,
        ControllerError::Forbidden(_) => StatusCode::FORBIDDEN,
        ControllerError::NotFound(_) | ControllerError::ClassificationError(_) => {
            StatusCode::NOT_FOUND
        }
        ControllerError::TaskNotReady(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(error: &ControllerError) -> &'static str {
    match error {
        ControllerError::ValidationError(_) => "validation_error",
        ControllerError::ArtifactNotFound(_) => "artifact_not_found",
        ControllerError::Conflict(_) => "conflict",
        ControllerError::Forbidden(_) => "forbidden",
        ControllerError::NotFound(_) => "not_found",
        ControllerError::ClassificationError(_) => "classification_error",
        ControllerError::TaskNotReady(_) => "task_not_ready",
        _ => "internal_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = error_to_status(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = ErrorResponse {
            error: error_kind(&self.0).to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Classify `request`, create its task and queue it.
///
/// Everything that can be rejected is checked before the task exists.
async fn accept(
    state: &ServerState,
    request: DeploymentRequest,
    check_release: bool,
) -> Result<(StatusCode, Json<TaskAcceptedResponse>), ApiError> {
    let plan = classify(state.registry.as_ref(), &request, &state.facilities).await?;

    if check_release {
        let tag = request.tag().unwrap_or_default();
        if !state.releases.available(request.component_name(), tag).await? {
            return Err(ControllerError::ArtifactNotFound(format!(
                "no release {} for {}",
                tag,
                request.component_name()
            ))
            .into());
        }
    }

    let task = state.tasks.create(state.scratch_dir.path()).await?;
    let job = DeploymentJob::new(task.task_id, &request, plan, task.temp_dir.clone())?;

    if let Err(e) = state.pool.submit(job) {
        if let Err(fail_err) = state.tasks.fail(&task.task_id, &e.to_string()).await {
            error!(task_id = %task.task_id, "Unable to record failure: {}", fail_err);
        }
        return Err(e.into());
    }

    info!(
        task_id = %task.task_id,
        component = %request.component_name(),
        user = %request.user(),
        "Deployment accepted"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAcceptedResponse {
            task_id: task.task_id,
            status: task.status.as_str().to_string(),
        }),
    ))
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: version.service,
        version: version.version,
    })
}

/// `PUT /deployment/ioc`
pub async fn deploy_ioc_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<IocDeploymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = DeploymentRequest::try_from(body)?;
    accept(&state, request, true).await
}

/// `PUT /deployment/display`
pub async fn deploy_display_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<DisplayDeploymentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = DeploymentRequest::try_from(body)?;
    accept(&state, request, false).await
}

/// `PUT /deployment/revert`
pub async fn revert_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<RevertBody>,
) -> Result<impl IntoResponse, ApiError> {
    let revert = match DeploymentRequest::try_from(body)? {
        DeploymentRequest::Revert(revert) => revert,
        other => {
            return Err(ControllerError::Internal(format!(
                "unexpected request variant for revert: {:?}",
                other
            ))
            .into());
        }
    };

    let planned = plan_revert(state.registry.as_ref(), &revert)
        .await?
        .ok_or_else(|| {
            ControllerError::ValidationError(format!(
                "nothing to revert for {} in {}",
                revert.component_name, revert.facility
            ))
        })?;

    accept(&state, DeploymentRequest::Instance(planned), true).await
}

/// `GET /deployment/{task_id}/status`
pub async fn task_status_handler(
    State(state): State<Arc<ServerState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task = state
        .tasks
        .get(&task_id)
        .await?
        .ok_or_else(|| ControllerError::NotFound(format!("task {}", task_id)))?;

    Ok(Json(TaskStatusResponse::from(&task)))
}

/// `GET /deployment/{task_id}/report`
pub async fn task_report_handler(
    State(state): State<Arc<ServerState>>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .tasks
        .get(&task_id)
        .await?
        .ok_or_else(|| ControllerError::NotFound(format!("task {}", task_id)))?;

    let result = match (&task.status, &task.result) {
        (TaskStatus::Completed, Some(result)) => result,
        _ => {
            return Err(ControllerError::TaskNotReady(format!(
                "task {} is {}",
                task_id, task.status
            ))
            .into());
        }
    };

    let file = File::new(&result.report_path);
    if !file.exists().await {
        return Err(ControllerError::NotFound(format!(
            "report {}",
            result.report_path.display()
        ))
        .into());
    }
    let report = file.read_string().await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        report,
    ))
}

/// `GET /deployment/info?component_name=X`
pub async fn component_info_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ComponentInfoQuery>,
) -> Result<Json<ComponentInfoResponse>, ApiError> {
    let deployments =
        find_component(state.registry.as_ref(), &state.facilities, &query.component_name).await?;

    if deployments.is_empty() {
        return Err(ControllerError::NotFound(format!(
            "{} is not deployed in any facility",
            query.component_name
        ))
        .into());
    }

    Ok(Json(ComponentInfoResponse {
        component_name: query.component_name,
        deployments,
    }))
}

/// `PUT /initial/deployment`
pub async fn initial_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<InitialDeploymentBody>,
) -> Result<Json<InitialDeploymentResponse>, ApiError> {
    let request = match DeploymentRequest::try_from(body)? {
        DeploymentRequest::InitialRegistration(request) => request,
        other => {
            return Err(ControllerError::Internal(format!(
                "unexpected request variant for registration: {:?}",
                other
            ))
            .into());
        }
    };

    if !state.admin_users.contains(&request.user) {
        return Err(ControllerError::Forbidden(format!(
            "{} may not register components",
            request.user
        ))
        .into());
    }
    if !state.facilities.contains(&request.facility) {
        return Err(
            ControllerError::ValidationError(format!("unknown facility {}", request.facility))
                .into(),
        );
    }

    let registry = state.registry.as_ref();
    if registry
        .get_component(&request.facility, &request.component_name)
        .await?
        .is_some()
    {
        return Err(ControllerError::Conflict(format!(
            "{} is already registered in {}",
            request.component_name, request.facility
        ))
        .into());
    }

    let mut record = ComponentRecord::new(
        &request.component_name,
        &request.facility,
        &request.tag,
        &request.component_type,
    );
    for instance in request.instance_names.iter().flatten() {
        record.set_instance_tag(instance, &request.tag);
    }
    registry.put_component(&record).await?;
    registry
        .record_deployment(&DeploymentHistoryEntry {
            component_name: record.name.clone(),
            facility: record.facility.clone(),
            tag: record.tag.clone(),
            user: request.user.clone(),
            timestamp: Utc::now(),
            depends_on: record.depends_on.clone(),
        })
        .await?;

    info!(
        component = %record.name,
        facility = %record.facility,
        user = %request.user,
        "Component registered"
    );
    Ok(Json(InitialDeploymentResponse {
        message: format!("{} registered in {}", record.name, record.facility),
        record,
    }))
}
