//! Logbook (audit) client

use async_trait::async_trait;
use openapi_client::LogbookEntry;

use crate::errors::ControllerError;
use crate::http::client::HttpClient;

/// Accepts free-text deployment summaries
#[async_trait]
pub trait LogbookExt: Send + Sync {
    async fn post_entry(&self, entry: &LogbookEntry) -> Result<(), ControllerError>;
}

/// Logbook reached over HTTP with basic auth
#[derive(Debug)]
pub struct LogbookClient {
    http: HttpClient,
}

impl LogbookClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LogbookExt for LogbookClient {
    async fn post_entry(&self, entry: &LogbookEntry) -> Result<(), ControllerError> {
        self.http
            .post("/entries", entry)
            .await
            .map_err(|e| ControllerError::LogbookError(e.to_string()))
    }
}
