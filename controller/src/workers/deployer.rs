//! Deployment worker pool
//!
//! Accepted jobs go onto an unbounded queue; a fixed number of symmetric
//! workers take one job at a time. Each job runs in its own spawned task so
//! a panic fails only that task.

use std::any::Any;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::deploy::executor::{DeploymentExecutor, DeploymentJob};
use crate::errors::ControllerError;
use crate::filesys::dir::Dir;

/// Deployer pool options
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of workers
    pub workers: usize,

    /// Delay before a finished task's scratch directory is removed
    pub cleanup_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            workers: 4,
            cleanup_delay: Duration::from_secs(60),
        }
    }
}

/// Receiving end of the job queue, consumed by [`run`]
pub type JobQueue = mpsc::UnboundedReceiver<DeploymentJob>;

/// Submission handle for the deployer workers
#[derive(Debug, Clone)]
pub struct DeployerPool {
    sender: mpsc::UnboundedSender<DeploymentJob>,
}

impl DeployerPool {
    pub fn new() -> (Self, JobQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue `job` and return immediately
    pub fn submit(&self, job: DeploymentJob) -> Result<(), ControllerError> {
        let task_id = job.task_id;
        self.sender
            .send(job)
            .map_err(|_| ControllerError::ShutdownError("deployer pool is not running".to_string()))?;
        debug!(task_id = %task_id, "Job queued");
        Ok(())
    }
}

/// Run the deployer workers until shutdown
pub async fn run(
    options: &Options,
    executor: Arc<DeploymentExecutor>,
    queue: JobQueue,
    shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Deployer pool starting with {} workers...", options.workers);

    let queue = Arc::new(Mutex::new(queue));
    let (stop_tx, stop_rx) = watch::channel(false);

    let handles: Vec<_> = (0..options.workers.max(1))
        .map(|id| {
            tokio::spawn(worker(
                id,
                executor.clone(),
                queue.clone(),
                options.cleanup_delay,
                stop_rx.clone(),
            ))
        })
        .collect();

    shutdown_signal.await;
    info!("Deployer pool shutting down...");
    let _ = stop_tx.send(true);

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!("Deployer worker exited abnormally: {}", e);
        }
    }
}

async fn worker(
    id: usize,
    executor: Arc<DeploymentExecutor>,
    queue: Arc<Mutex<JobQueue>>,
    cleanup_delay: Duration,
    mut stop: watch::Receiver<bool>,
) {
    debug!("Deployer worker {} ready", id);

    loop {
        let job = tokio::select! {
            _ = stop.changed() => {
                debug!("Deployer worker {} stopping", id);
                return;
            }
            job = async { queue.lock().await.recv().await } => job,
        };

        match job {
            Some(job) => execute_job(&executor, job, cleanup_delay).await,
            None => {
                debug!("Job queue closed, worker {} stopping", id);
                return;
            }
        }
    }
}

/// Run one job to completion, then schedule its scratch cleanup
pub async fn execute_job(executor: &Arc<DeploymentExecutor>, job: DeploymentJob, cleanup_delay: Duration) {
    let task_id = job.task_id;
    let scratch_dir = job.scratch_dir.clone();

    let runner = executor.clone();
    let outcome = tokio::spawn(async move { runner.run(&job).await }).await;

    if let Err(e) = outcome {
        let reason = if e.is_panic() {
            panic_message(e.into_panic())
        } else {
            e.to_string()
        };
        error!(task_id = %task_id, "Deployment crashed: {}", reason);
        let message = format!("Infrastructure error: {}", reason);
        if let Err(e) = executor.tasks().fail(&task_id, &message).await {
            error!(task_id = %task_id, "Unable to record failure: {}", e);
        }
    }

    schedule_cleanup(scratch_dir, cleanup_delay);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

/// Remove `scratch_dir` after `delay`, best effort
fn schedule_cleanup(scratch_dir: PathBuf, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match Dir::new(&scratch_dir).delete().await {
            Ok(()) => debug!("Removed scratch directory {}", scratch_dir.display()),
            Err(e) => warn!("Failed to remove {}: {}", scratch_dir.display(), e),
        }
    });
}
