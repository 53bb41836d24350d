//! Server state

use std::sync::Arc;

use crate::deploy::release::ReleaseFetcher;
use crate::filesys::dir::Dir;
use crate::registry::RegistryExt;
use crate::tasks::TaskEngine;
use crate::workers::deployer::DeployerPool;

/// Server state shared across handlers
pub struct ServerState {
    pub tasks: Arc<TaskEngine>,
    pub registry: Arc<dyn RegistryExt>,
    pub releases: ReleaseFetcher,
    pub pool: DeployerPool,
    /// Root of the per-task scratch directories
    pub scratch_dir: Dir,
    /// Every facility the controller deploys to
    pub facilities: Vec<String>,
    /// Users allowed to register components without provisioning
    pub admin_users: Vec<String>,
}

impl ServerState {
    pub fn new(
        tasks: Arc<TaskEngine>,
        registry: Arc<dyn RegistryExt>,
        releases: ReleaseFetcher,
        pool: DeployerPool,
        scratch_dir: Dir,
        facilities: Vec<String>,
        admin_users: Vec<String>,
    ) -> Self {
        Self {
            tasks,
            registry,
            releases,
            pool,
            scratch_dir,
            facilities,
            admin_users,
        }
    }
}
