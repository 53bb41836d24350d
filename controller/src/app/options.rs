//! Application configuration options
//!
//! Settings are resolved once at startup into an immutable [`AppOptions`]
//! that is passed into every component.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::errors::ControllerError;
use crate::http::client::BasicAuth;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{LogbookSettings, Settings};
use crate::workers::{deployer, sweeper};

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage configuration
    pub storage: StorageOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Collaborator endpoints for the selected environment
    pub endpoints: EndpointOptions,

    /// Facilities the controller deploys to
    pub facilities: Vec<String>,

    /// OS variants, lowest merge priority first
    pub os_variants: Vec<String>,

    /// Users allowed to register components without provisioning
    pub admin_users: Vec<String>,

    /// Lifetime of a task record after its last update
    pub task_ttl: Duration,

    /// Deployer pool options
    pub deployer: deployer::Options,

    /// Sweeper worker options
    pub sweeper: sweeper::Options,

    /// Logbook credentials
    pub logbook_credentials: BasicAuth,
}

impl AppOptions {
    /// Resolve `settings` for the given layout and credentials
    pub fn from_settings(
        settings: &Settings,
        layout: StorageLayout,
        logbook_credentials: BasicAuth,
    ) -> Result<Self, ControllerError> {
        if settings.facilities.is_empty() {
            return Err(ControllerError::ConfigError(
                "at least one facility must be configured".to_string(),
            ));
        }
        if settings.os_variants.is_empty() {
            return Err(ControllerError::ConfigError(
                "at least one OS variant must be configured".to_string(),
            ));
        }

        let selected = settings.endpoints.select(settings.production);
        let endpoints = EndpointOptions {
            registry_url: validate_url("registry_url", &selected.registry_url)?,
            logbook_url: validate_url("logbook_url", &selected.logbook_url)?,
            release_url: validate_url("release_url", &selected.release_url)?,
            playbook_root: PathBuf::from(&selected.playbook_root),
        };

        Ok(Self {
            lifecycle: LifecycleOptions::default(),
            storage: StorageOptions { layout },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            endpoints,
            facilities: settings.facilities.clone(),
            os_variants: settings.os_variants.clone(),
            admin_users: settings.admin_users.clone(),
            task_ttl: Duration::from_secs(settings.task_ttl_secs),
            deployer: deployer::Options {
                workers: settings.workers.max(1),
                cleanup_delay: Duration::from_secs(settings.cleanup_delay_secs),
            },
            sweeper: sweeper::Options {
                interval: Duration::from_secs(settings.sweep_interval_secs),
                max_age: Duration::from_secs(settings.orphan_max_age_secs),
            },
            logbook_credentials,
        })
    }
}

fn validate_url(name: &str, value: &str) -> Result<String, ControllerError> {
    let url = Url::parse(value)
        .map_err(|e| ControllerError::ConfigError(format!("invalid {} {:?}: {}", name, value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ControllerError::ConfigError(format!(
            "{} must be an http(s) URL, got {}",
            name, value
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Pick logbook credentials from the settings file, falling back to the
/// values given (normally taken from the environment by `main`).
///
/// Missing credentials are a configuration error.
pub fn resolve_logbook_credentials(
    settings: &LogbookSettings,
    fallback_username: Option<String>,
    fallback_password: Option<String>,
) -> Result<BasicAuth, ControllerError> {
    let username = settings
        .username
        .clone()
        .or(fallback_username)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ControllerError::ConfigError("logbook username is not set".to_string()))?;
    let password = settings
        .password
        .clone()
        .or(fallback_password)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ControllerError::ConfigError("logbook password is not set".to_string()))?;

    Ok(BasicAuth {
        username,
        password: SecretString::from(password),
    })
}

/// Resolved collaborator endpoints
#[derive(Debug, Clone)]
pub struct EndpointOptions {
    pub registry_url: String,
    pub logbook_url: String,
    pub release_url: String,
    pub playbook_root: PathBuf,
}

/// Lifecycle options for the controller
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Storage layout paths
    pub layout: StorageLayout,
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
