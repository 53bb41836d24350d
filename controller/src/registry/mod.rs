//! Component registry port
//!
//! The registry is the system of record for what is deployed where. The
//! controller reads component records to classify requests and writes
//! them (plus a history entry) after each successful facility deployment.

pub mod memory;

use async_trait::async_trait;
use openapi_client::{ComponentRecord, DeploymentHistoryEntry};

use crate::errors::ControllerError;

pub use memory::MemoryRegistry;

/// Registry operations used by the controller
#[async_trait]
pub trait RegistryExt: Send + Sync {
    /// Record for `name` in `facility`, `None` if not deployed there
    async fn get_component(
        &self,
        facility: &str,
        name: &str,
    ) -> Result<Option<ComponentRecord>, ControllerError>;

    /// Create or replace the record for `record.name` in `record.facility`
    async fn put_component(&self, record: &ComponentRecord) -> Result<(), ControllerError>;

    /// Most recent history entries first, at most `limit`
    async fn deployment_history(
        &self,
        name: &str,
        facility: &str,
        limit: usize,
    ) -> Result<Vec<DeploymentHistoryEntry>, ControllerError>;

    /// Append a history entry
    async fn record_deployment(&self, entry: &DeploymentHistoryEntry)
        -> Result<(), ControllerError>;
}

/// Records for `name` in every facility where it is deployed
pub async fn find_component(
    registry: &dyn RegistryExt,
    facilities: &[String],
    name: &str,
) -> Result<Vec<ComponentRecord>, ControllerError> {
    let mut found = Vec::new();
    for facility in facilities {
        if let Some(record) = registry.get_component(facility, name).await? {
            found.push(record);
        }
    }
    Ok(found)
}
