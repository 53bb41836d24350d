//! Sweeper worker
//!
//! Removes scratch directories left behind by tasks that never reached
//! their own cleanup (e.g. after a crash) and purges expired task records.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::errors::ControllerError;
use crate::filesys::dir::Dir;
use crate::tasks::MemoryTaskStore;

/// Sweeper worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Time between sweeps
    pub interval: Duration,

    /// Scratch directories older than this are removed
    pub max_age: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            max_age: Duration::from_secs(3600),
        }
    }
}

/// Delete every subdirectory of `scratch` older than `max_age`
pub async fn sweep_scratch(scratch: &Dir, max_age: Duration) -> Result<usize, ControllerError> {
    if !scratch.exists().await {
        return Ok(0);
    }

    let mut removed = 0;
    for dir in scratch.list_dirs().await? {
        match dir.age().await {
            Ok(age) if age > max_age => {
                info!("Removing orphaned scratch directory {}", dir.path().display());
                dir.delete().await?;
                removed += 1;
            }
            Ok(_) => {}
            Err(e) => warn!("Unable to read age of {}: {}", dir.path().display(), e),
        }
    }
    Ok(removed)
}

/// Run the sweeper worker
pub async fn run<S, F>(
    options: &Options,
    scratch: &Dir,
    task_store: Option<Arc<MemoryTaskStore>>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Sweeper worker starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Sweeper worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }

        match sweep_scratch(scratch, options.max_age).await {
            Ok(removed) => debug!("Sweep removed {} scratch directories", removed),
            Err(e) => error!("Scratch sweep failed: {}", e),
        }

        if let Some(store) = &task_store {
            let purged = store.purge_expired().await;
            debug!("Purged {} expired task records", purged);
        }
    }
}
