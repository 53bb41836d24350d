//! On-disk layout under the controller's base directory
//!
//! ```text
//! <base>/settings.json
//! <base>/reports/    one file per finished task
//! <base>/scratch/    one directory per running task
//! <base>/logs/
//! ```

use std::path::PathBuf;

use crate::errors::ControllerError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

pub const DEFAULT_BASE_DIR: &str = "/var/lib/deployctl";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    pub fn reports_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("reports"))
    }

    pub fn scratch_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("scratch"))
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Create every directory the controller writes to
    pub async fn setup(&self) -> Result<(), ControllerError> {
        for dir in [self.reports_dir(), self.scratch_dir(), self.logs_dir()] {
            dir.create().await?;
        }
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}
