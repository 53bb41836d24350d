//! Controller API models

use chrono::{DateTime, Utc};
use openapi_client::ComponentRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_ioc_type() -> String {
    "ioc".to_string()
}

/// IOC deployment request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IocDeploymentBody {
    pub component_name: String,
    #[serde(default)]
    pub facilities: Option<Vec<String>>,
    pub tag: String,
    #[serde(default)]
    pub instance_names: Option<Vec<String>>,
    pub user: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_ioc_type")]
    pub component_type: String,
}

/// Display (screen bundle) deployment request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayDeploymentBody {
    pub component_name: String,
    pub facilities: Vec<String>,
    pub tag: String,
    pub user: String,
    #[serde(default)]
    pub dry_run: bool,
}

/// Revert request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertBody {
    pub component_name: String,
    pub facility: String,
    pub user: String,
    #[serde(default)]
    pub instance_names: Option<Vec<String>>,
}

/// Registry-only registration request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialDeploymentBody {
    pub component_name: String,
    pub facility: String,
    pub tag: String,
    #[serde(default)]
    pub instance_names: Option<Vec<String>>,
    pub user: String,
    #[serde(rename = "type", default = "default_ioc_type")]
    pub component_type: String,
}

/// Query for `GET /deployment/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfoQuery {
    pub component_name: String,
}

/// Returned when a task has been accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAcceptedResponse {
    pub task_id: Uuid,
    pub status: String,
}

/// Progress section of a task status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgressBody {
    pub step: String,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Task status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: Uuid,
    pub status: String,
    pub progress: TaskProgressBody,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a component is currently deployed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfoResponse {
    pub component_name: String,
    pub deployments: Vec<ComponentRecord>,
}

/// Registration result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialDeploymentResponse {
    pub message: String,
    pub record: ComponentRecord,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
