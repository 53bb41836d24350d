//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::ControllerError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::deployer::{self, DeployerPool, JobQueue};
use crate::workers::sweeper;

/// Run the deployment controller until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ControllerError> {
    info!("Initializing deployment controller...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start controller: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), ControllerError> {
    let app_state = Arc::new(AppState::init(options).await?);
    let (pool, queue) = DeployerPool::new();

    init_deployer_pool(
        options.deployer.clone(),
        app_state.clone(),
        queue,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )?;

    init_sweeper_worker(
        options,
        app_state.clone(),
        shutdown_manager,
        shutdown_tx.subscribe(),
    )?;

    init_server(
        options,
        app_state,
        pool,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await
}

fn init_deployer_pool(
    options: deployer::Options,
    app_state: Arc<AppState>,
    queue: JobQueue,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ControllerError> {
    info!("Initializing deployer pool...");

    let executor = app_state.executor.clone();
    let deployer_handle = tokio::spawn(async move {
        deployer::run(
            &options,
            executor,
            queue,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_deployer_handle(deployer_handle)
}

fn init_sweeper_worker(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ControllerError> {
    info!("Initializing sweeper worker...");

    let sweeper_options = options.sweeper.clone();
    let scratch = options.storage.layout.scratch_dir();
    let task_store = app_state.task_store.clone();

    let sweeper_handle = tokio::spawn(async move {
        sweeper::run(
            &sweeper_options,
            &scratch,
            Some(task_store),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_sweeper_handle(sweeper_handle)
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    pool: DeployerPool,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ControllerError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(
        app_state.tasks.clone(),
        app_state.registry.clone(),
        app_state.releases.clone(),
        pool,
        options.storage.layout.scratch_dir(),
        options.facilities.clone(),
        options.admin_users.clone(),
    );

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    server_handle: Option<JoinHandle<Result<(), ControllerError>>>,
    deployer_handle: Option<JoinHandle<()>>,
    sweeper_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            server_handle: None,
            deployer_handle: None,
            sweeper_handle: None,
        }
    }

    pub fn with_deployer_handle(&mut self, handle: JoinHandle<()>) -> Result<(), ControllerError> {
        if self.deployer_handle.is_some() {
            return Err(ControllerError::ShutdownError("deployer_handle already set".to_string()));
        }
        self.deployer_handle = Some(handle);
        Ok(())
    }

    pub fn with_sweeper_handle(&mut self, handle: JoinHandle<()>) -> Result<(), ControllerError> {
        if self.sweeper_handle.is_some() {
            return Err(ControllerError::ShutdownError("sweeper_handle already set".to_string()));
        }
        self.sweeper_handle = Some(handle);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), ControllerError>>,
    ) -> Result<(), ControllerError> {
        if self.server_handle.is_some() {
            return Err(ControllerError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), ControllerError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ControllerError> {
        info!("Shutting down deployment controller...");

        // 1. Stop accepting requests
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| ControllerError::ShutdownError(e.to_string()))??;
        }

        // 2. Deployer pool, lets running jobs finish
        if let Some(handle) = self.deployer_handle.take() {
            handle.await.map_err(|e| ControllerError::ShutdownError(e.to_string()))?;
        }

        // 3. Sweeper
        if let Some(handle) = self.sweeper_handle.take() {
            handle.await.map_err(|e| ControllerError::ShutdownError(e.to_string()))?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
