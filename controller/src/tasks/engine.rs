//! Task engine
//!
//! Owns the lifecycle of deployment task records:
//! `Pending -> Running -> {Completed | Failed}`. Every write goes to the
//! task store with a fresh TTL. Tasks still executing in this process are
//! also kept in a local map, so a record that expires during a long
//! provisioning step is rewritten on the next update instead of lost.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::deploy::fsm::TaskEvent;
use crate::errors::ControllerError;
use crate::models::task::{DeploymentTask, TaskResult};
use crate::tasks::store::TaskStoreExt;

/// Default lifetime of a task record after its last update
pub const DEFAULT_TASK_TTL: Duration = Duration::from_secs(300);

pub struct TaskEngine {
    store: Arc<dyn TaskStoreExt>,
    ttl: Duration,
    live: Mutex<HashMap<Uuid, DeploymentTask>>,
}

impl TaskEngine {
    pub fn new(store: Arc<dyn TaskStoreExt>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            live: Mutex::new(HashMap::new()),
        }
    }

    fn key(task_id: &Uuid) -> String {
        format!("deployment-task:{}", task_id)
    }

    async fn save(&self, task: &DeploymentTask) -> Result<(), ControllerError> {
        let value = serde_json::to_vec(task)?;
        self.store
            .set_with_ttl(&Self::key(&task.task_id), &value, self.ttl)
            .await
    }

    /// Allocate a task id and persist a pending record.
    ///
    /// The task's scratch directory is `<scratch_root>/<task_id>`.
    pub async fn create(&self, scratch_root: &Path) -> Result<DeploymentTask, ControllerError> {
        let task_id = Uuid::new_v4();
        let task = DeploymentTask::new(task_id, scratch_root.join(task_id.to_string()));

        self.save(&task).await?;
        self.live.lock().await.insert(task_id, task.clone());

        info!(task_id = %task_id, "Task created");
        Ok(task)
    }

    /// Current record, `None` if unknown or expired
    pub async fn get(&self, task_id: &Uuid) -> Result<Option<DeploymentTask>, ControllerError> {
        match self.store.get(&Self::key(task_id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Apply `event` to the task, then `update` the record.
    ///
    /// Events rejected by the state machine leave the record untouched.
    /// The live map lock is never held across store calls.
    async fn apply<F>(&self, task_id: &Uuid, event: TaskEvent, update: F) -> Result<(), ControllerError>
    where
        F: FnOnce(&mut DeploymentTask),
    {
        let mut task = match self.get(task_id).await? {
            Some(task) => task,
            None => {
                let cached = self.live.lock().await.get(task_id).cloned();
                match cached {
                    Some(task) => {
                        warn!(task_id = %task_id, "Task record expired while running, rewriting");
                        task
                    }
                    None => {
                        return Err(ControllerError::NotFound(format!("task {}", task_id)));
                    }
                }
            }
        };

        let next = match task.status.process(&event) {
            Ok(next) => next,
            Err(e) => {
                debug!(task_id = %task_id, "Ignoring event: {}", e);
                return Ok(());
            }
        };

        task.status = next;
        update(&mut task);
        task.updated_at = Utc::now();
        self.save(&task).await?;

        let mut live = self.live.lock().await;
        if task.status.is_terminal() {
            live.remove(task_id);
        } else {
            live.insert(*task_id, task);
        }
        Ok(())
    }

    /// Record progress and move the task to `Running`.
    ///
    /// The stored percent never decreases; no-op once the task is terminal.
    pub async fn update_progress(
        &self,
        task_id: &Uuid,
        step: &str,
        percent: u8,
        details: Option<String>,
    ) -> Result<(), ControllerError> {
        debug!(task_id = %task_id, step, percent, "Task progress");
        self.apply(task_id, TaskEvent::Progress, |task| {
            task.progress.step = step.to_string();
            task.progress.percent = task.progress.percent.max(percent.min(100));
            task.progress.details = details;
        })
        .await
    }

    /// Mark the task completed; no-op once terminal
    pub async fn complete(&self, task_id: &Uuid, result: TaskResult) -> Result<(), ControllerError> {
        info!(task_id = %task_id, success = result.success, "Task completed");
        self.apply(task_id, TaskEvent::Complete, |task| {
            task.progress.step = "Completed".to_string();
            task.progress.percent = 100;
            task.result = Some(result);
        })
        .await
    }

    /// Mark the task failed; no-op once terminal
    pub async fn fail(&self, task_id: &Uuid, error: &str) -> Result<(), ControllerError> {
        warn!(task_id = %task_id, "Task failed: {}", error);
        let event = TaskEvent::Fail(error.to_string());
        self.apply(task_id, event, |task| {
            task.progress.step = "Failed".to_string();
            task.error = Some(error.to_string());
        })
        .await
    }
}
