//! Application state management

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::executor::DeploymentExecutor;
use crate::deploy::provisioner::{AnsibleProvisioner, ProvisionerExt};
use crate::deploy::release::ReleaseFetcher;
use crate::deploy::report::ReportPublisher;
use crate::errors::ControllerError;
use crate::http::client::{BasicAuth, HttpClient};
use crate::http::logbook::{LogbookClient, LogbookExt};
use crate::http::registry::RegistryClient;
use crate::http::releases::{ReleaseClient, ReleaseStoreExt};
use crate::registry::RegistryExt;
use crate::tasks::{MemoryTaskStore, TaskEngine};

/// Long-lived components shared by the workers and the server
pub struct AppState {
    pub task_store: Arc<MemoryTaskStore>,
    pub tasks: Arc<TaskEngine>,
    pub registry: Arc<dyn RegistryExt>,
    pub releases: ReleaseFetcher,
    pub executor: Arc<DeploymentExecutor>,
}

impl AppState {
    /// Build the collaborator clients and the orchestration engine
    pub async fn init(options: &AppOptions) -> Result<Self, ControllerError> {
        info!("Initializing application state...");

        let layout = &options.storage.layout;
        layout.setup().await?;

        let endpoints = &options.endpoints;
        let registry: Arc<dyn RegistryExt> = Arc::new(RegistryClient::new(HttpClient::new(
            &endpoints.registry_url,
        )?));
        let release_store: Arc<dyn ReleaseStoreExt> =
            Arc::new(ReleaseClient::new(HttpClient::new(&endpoints.release_url)?));

        let auth = &options.logbook_credentials;
        let credentials = BasicAuth {
            username: auth.username.clone(),
            password: SecretString::from(auth.password.expose_secret().to_string()),
        };
        let logbook: Arc<dyn LogbookExt> = Arc::new(LogbookClient::new(
            HttpClient::with_basic_auth(&endpoints.logbook_url, credentials)?,
        ));
        let provisioner: Arc<dyn ProvisionerExt> = Arc::new(AnsibleProvisioner::new());

        let task_store = Arc::new(MemoryTaskStore::new());
        let tasks = Arc::new(TaskEngine::new(task_store.clone(), options.task_ttl));
        let releases = ReleaseFetcher::new(release_store, options.os_variants.clone());

        let executor = Arc::new(DeploymentExecutor::new(
            tasks.clone(),
            registry.clone(),
            releases.clone(),
            provisioner,
            ReportPublisher::new(layout.reports_dir(), logbook),
            endpoints.playbook_root.clone(),
        ));

        Ok(Self {
            task_store,
            tasks,
            registry,
            releases,
            executor,
        })
    }
}
