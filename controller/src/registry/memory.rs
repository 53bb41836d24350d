//! In-memory registry

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use openapi_client::{ComponentRecord, DeploymentHistoryEntry};
use tokio::sync::RwLock;

use crate::errors::ControllerError;
use crate::registry::RegistryExt;

/// Registry held in process memory
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    components: RwLock<HashMap<(String, String), ComponentRecord>>,
    history: RwLock<Vec<DeploymentHistoryEntry>>,
    writes: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a component record without counting it as a write
    pub async fn insert_component(&self, record: ComponentRecord) {
        let key = (record.facility.clone(), record.name.clone());
        self.components.write().await.insert(key, record);
    }

    /// Seed a history entry without counting it as a write
    pub async fn insert_history(&self, entry: DeploymentHistoryEntry) {
        self.history.write().await.push(entry);
    }

    /// Number of writes made through the registry operations
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// All history entries in insertion order
    pub async fn history(&self) -> Vec<DeploymentHistoryEntry> {
        self.history.read().await.clone()
    }
}

#[async_trait]
impl RegistryExt for MemoryRegistry {
    async fn get_component(
        &self,
        facility: &str,
        name: &str,
    ) -> Result<Option<ComponentRecord>, ControllerError> {
        let components = self.components.read().await;
        Ok(components
            .get(&(facility.to_string(), name.to_string()))
            .cloned())
    }

    async fn put_component(&self, record: &ComponentRecord) -> Result<(), ControllerError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.insert_component(record.clone()).await;
        Ok(())
    }

    async fn deployment_history(
        &self,
        name: &str,
        facility: &str,
        limit: usize,
    ) -> Result<Vec<DeploymentHistoryEntry>, ControllerError> {
        let history = self.history.read().await;
        let mut entries: Vec<_> = history
            .iter()
            .filter(|e| e.component_name == name && e.facility == facility)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn record_deployment(
        &self,
        entry: &DeploymentHistoryEntry,
    ) -> Result<(), ControllerError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.insert_history(entry.clone()).await;
        Ok(())
    }
}
