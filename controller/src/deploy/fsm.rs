//! Finite state machine for deployment tasks

use serde::{Deserialize, Serialize};

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, not yet picked up by a worker
    Pending,

    /// A worker is executing the task
    Running,

    /// Execution finished and a report was produced
    Completed,

    /// Execution aborted
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Terminal states accept no further events
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Process an event and return the next status
    pub fn process(&self, event: &TaskEvent) -> Result<TaskStatus, String> {
        let next = match (self, event) {
            (TaskStatus::Pending | TaskStatus::Running, TaskEvent::Progress) => TaskStatus::Running,
            (TaskStatus::Pending | TaskStatus::Running, TaskEvent::Complete) => {
                TaskStatus::Completed
            }
            (TaskStatus::Pending | TaskStatus::Running, TaskEvent::Fail(_)) => TaskStatus::Failed,

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };
        Ok(next)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task event
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Progress was reported
    Progress,

    /// Execution finished
    Complete,

    /// Execution aborted
    Fail(String),
}
