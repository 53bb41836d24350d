//! Release artifact store client

use std::path::Path;

use async_trait::async_trait;

use crate::errors::ControllerError;
use crate::http::client::HttpClient;

/// Release lookup and download
#[async_trait]
pub trait ReleaseStoreExt: Send + Sync {
    /// Whether the archive for `(component, tag, variant)` exists
    async fn exists(
        &self,
        component: &str,
        tag: &str,
        variant: Option<&str>,
    ) -> Result<bool, ControllerError>;

    /// Download the archive to `dest`; false if the store does not have it
    async fn download(
        &self,
        component: &str,
        tag: &str,
        variant: Option<&str>,
        dest: &Path,
    ) -> Result<bool, ControllerError>;
}

/// File name of a release archive
pub fn archive_name(tag: &str, variant: Option<&str>) -> String {
    match variant {
        Some(variant) => format!("{}-{}.tar.gz", tag, variant),
        None => format!("{}.tar.gz", tag),
    }
}

/// Release store reached over HTTP
#[derive(Debug)]
pub struct ReleaseClient {
    http: HttpClient,
}

impl ReleaseClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn path(component: &str, tag: &str, variant: Option<&str>) -> String {
        format!("/{}/{}", component, archive_name(tag, variant))
    }
}

#[async_trait]
impl ReleaseStoreExt for ReleaseClient {
    async fn exists(
        &self,
        component: &str,
        tag: &str,
        variant: Option<&str>,
    ) -> Result<bool, ControllerError> {
        self.http.head(&Self::path(component, tag, variant)).await
    }

    async fn download(
        &self,
        component: &str,
        tag: &str,
        variant: Option<&str>,
        dest: &Path,
    ) -> Result<bool, ControllerError> {
        self.http
            .download(&Self::path(component, tag, variant), dest)
            .await
    }
}
