//! Registry REST client

use async_trait::async_trait;
use openapi_client::{ComponentRecord, DeploymentHistoryEntry};

use crate::errors::ControllerError;
use crate::http::client::HttpClient;
use crate::registry::RegistryExt;

/// Registry reached over its REST API
#[derive(Debug)]
pub struct RegistryClient {
    http: HttpClient,
}

impl RegistryClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

fn registry_error(err: ControllerError) -> ControllerError {
    match err {
        ControllerError::RegistryError(_) => err,
        other => ControllerError::RegistryError(other.to_string()),
    }
}

#[async_trait]
impl RegistryExt for RegistryClient {
    async fn get_component(
        &self,
        facility: &str,
        name: &str,
    ) -> Result<Option<ComponentRecord>, ControllerError> {
        let path = format!("/components/{}/{}", facility, name);
        self.http.get_optional(&path).await.map_err(registry_error)
    }

    async fn put_component(&self, record: &ComponentRecord) -> Result<(), ControllerError> {
        let path = format!("/components/{}/{}", record.facility, record.name);
        self.http.put(&path, record).await.map_err(registry_error)
    }

    async fn deployment_history(
        &self,
        name: &str,
        facility: &str,
        limit: usize,
    ) -> Result<Vec<DeploymentHistoryEntry>, ControllerError> {
        let path = format!("/history/{}/{}?limit={}", facility, name, limit);
        let mut entries: Vec<DeploymentHistoryEntry> = self
            .http
            .get_optional(&path)
            .await
            .map_err(registry_error)?
            .unwrap_or_default();

        // The registry does not promise an order
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn record_deployment(
        &self,
        entry: &DeploymentHistoryEntry,
    ) -> Result<(), ControllerError> {
        self.http.post("/history", entry).await.map_err(registry_error)
    }
}
