//! Error types for the deployment controller

use thiserror::Error;

/// Main error type for the deployment controller
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Classification error: {0}")]
    ClassificationError(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Provisioning error: {0}")]
    ProvisioningError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Logbook error: {0}")]
    LogbookError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Task not ready: {0}")]
    TaskNotReady(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
