//! Single-file helpers over `tokio::fs`

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::ControllerError;

#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True only for an existing regular file
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .is_ok_and(|m| m.is_file())
    }

    pub async fn read_string(&self) -> Result<String, ControllerError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, ControllerError> {
        let contents = self.read_string().await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Overwrite in place, creating parent directories
    pub async fn write_string(&self, contents: &str) -> Result<(), ControllerError> {
        self.ensure_parent().await?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }

    /// Write to `<name>.tmp` next to the file, then rename over it.
    ///
    /// Readers see either the old contents or the new ones, never a mix.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), ControllerError> {
        self.ensure_parent().await?;
        let staging = self.path.with_extension("tmp");

        let mut file = fs::File::create(&staging).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    /// Remove the file if present
    pub async fn delete(&self) -> Result<(), ControllerError> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn ensure_parent(&self) -> Result<(), ControllerError> {
        match self.path.parent() {
            Some(parent) => Ok(fs::create_dir_all(parent).await?),
            None => Ok(()),
        }
    }
}
