//! Deployment task record

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use openapi_server::{TaskProgressBody, TaskStatusResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deploy::fsm::TaskStatus;

/// Progress of a running task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub step: String,
    /// 0-100, never decreases
    pub percent: u8,
    pub details: Option<String>,
}

/// Outcome of a completed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub report: String,
    pub report_path: PathBuf,
    /// Whether every facility succeeded
    pub success: bool,
}

/// Persisted state of one deployment task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTask {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub progress: TaskProgress,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub temp_dir: PathBuf,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
}

impl DeploymentTask {
    /// Create a new pending task
    pub fn new(task_id: Uuid, temp_dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            status: TaskStatus::Pending,
            progress: TaskProgress {
                step: "Queued".to_string(),
                percent: 0,
                details: None,
            },
            started_at: now,
            updated_at: now,
            temp_dir,
            result: None,
            error: None,
        }
    }
}

impl From<&DeploymentTask> for TaskStatusResponse {
    fn from(task: &DeploymentTask) -> Self {
        TaskStatusResponse {
            task_id: task.task_id,
            status: task.status.as_str().to_string(),
            progress: TaskProgressBody {
                step: task.progress.step.clone(),
                percent: task.progress.percent,
                details: task.progress.details.clone(),
            },
            started_at: task.started_at,
            updated_at: task.updated_at,
            report_path: task
                .result
                .as_ref()
                .map(|r| r.report_path.display().to_string()),
            error: task.error.clone(),
        }
    }
}
