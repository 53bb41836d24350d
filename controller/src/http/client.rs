//! HTTP client implementation

use std::path::Path;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::errors::ControllerError;
use crate::utils::user_agent;

/// Basic-auth credentials attached to every request
#[derive(Debug)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// HTTP client bound to one collaborator's base URL.
///
/// No request timeout is set: a hung collaborator stalls only the task
/// that is waiting on it.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: Option<BasicAuth>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, ControllerError> {
        let client = Client::builder().user_agent(user_agent()).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Create a new HTTP client that authenticates with basic auth
    pub fn with_basic_auth(base_url: &str, credentials: BasicAuth) -> Result<Self, ControllerError> {
        let mut client = Self::new(base_url)?;
        client.credentials = Some(credentials);
        Ok(client)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let request = self.client.request(method, &url);
        match &self.credentials {
            Some(auth) => request.basic_auth(&auth.username, Some(auth.password.expose_secret())),
            None => request,
        }
    }

    async fn failure(method: &str, response: reqwest::Response) -> ControllerError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        error!("HTTP {} {} failed: {} - {}", method, url, status, body);
        ControllerError::ServerError(format!("{} {}: {} - {}", method, url, status, body))
    }

    /// GET a JSON document; `None` on 404
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ControllerError> {
        let response = self.request(Method::GET, path).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::failure("GET", response).await);
        }

        Ok(Some(response.json().await?))
    }

    /// PUT a JSON body, ignoring the response body
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ControllerError> {
        let response = self.request(Method::PUT, path).json(body).send().await?;

        if !response.status().is_success() {
            return Err(Self::failure("PUT", response).await);
        }
        Ok(())
    }

    /// POST a JSON body, ignoring the response body
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ControllerError> {
        let response = self.request(Method::POST, path).json(body).send().await?;

        if !response.status().is_success() {
            return Err(Self::failure("POST", response).await);
        }
        Ok(())
    }

    /// HEAD a resource; true only on 200
    pub async fn head(&self, path: &str) -> Result<bool, ControllerError> {
        let response = self.request(Method::HEAD, path).send().await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Stream a resource to `dest` chunk by chunk.
    ///
    /// Returns false on any non-200 status, without retrying.
    pub async fn download(&self, path: &str, dest: &Path) -> Result<bool, ControllerError> {
        let mut response = self.request(Method::GET, path).send().await?;

        if response.status() != StatusCode::OK {
            debug!("Download of {} returned {}", path, response.status());
            return Ok(false);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.sync_all().await?;

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(true)
    }
}
