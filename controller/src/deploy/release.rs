//! Release fetcher
//!
//! Downloads tagged release archives from the release store and optionally
//! extracts them. In multi-variant mode every OS variant is unpacked into
//! one shared tree in priority order, so a later variant overwrites files
//! shipped by an earlier one, and the merged tree is re-archived under the
//! plain tag name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::ControllerError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::http::releases::{archive_name, ReleaseStoreExt};

/// Fetches releases for one controller, in a fixed variant order
#[derive(Clone)]
pub struct ReleaseFetcher {
    store: Arc<dyn ReleaseStoreExt>,
    variants: Vec<String>,
}

impl ReleaseFetcher {
    pub fn new(store: Arc<dyn ReleaseStoreExt>, variants: Vec<String>) -> Self {
        Self { store, variants }
    }

    /// `{dest}/{tag}.tar.gz`
    pub fn archive_path(dest: &Path, tag: &str) -> PathBuf {
        dest.join(archive_name(tag, None))
    }

    /// `{dest}/{tag}/`, the extracted tree
    pub fn tree_path(dest: &Path, tag: &str) -> PathBuf {
        dest.join(tag)
    }

    /// Whether any archive exists for `(component, tag)`
    pub async fn available(&self, component: &str, tag: &str) -> Result<bool, ControllerError> {
        if self.store.exists(component, tag, None).await? {
            return Ok(true);
        }
        for variant in &self.variants {
            if self.store.exists(component, tag, Some(variant)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Fetch a release into `dest`.
    ///
    /// In multi-variant mode the plain `{tag}.tar.gz` is used when no
    /// variant archive exists, matching what `available` accepts.
    /// Returns false when no archive could be downloaded. HTTP failures
    /// are not retried.
    pub async fn fetch(
        &self,
        component: &str,
        tag: &str,
        dest: &Path,
        all_variants: bool,
        extract: bool,
    ) -> Result<bool, ControllerError> {
        Dir::new(dest).create().await?;

        if all_variants {
            self.fetch_variants(component, tag, dest, extract).await
        } else {
            self.fetch_single(component, tag, dest, extract).await
        }
    }

    async fn fetch_single(
        &self,
        component: &str,
        tag: &str,
        dest: &Path,
        extract: bool,
    ) -> Result<bool, ControllerError> {
        let archive = Self::archive_path(dest, tag);
        if !self.store.download(component, tag, None, &archive).await? {
            info!(component, tag, "Release not found");
            return Ok(false);
        }

        if extract {
            unpack_archive(&archive, &Self::tree_path(dest, tag)).await?;
        }
        Ok(true)
    }

    async fn fetch_variants(
        &self,
        component: &str,
        tag: &str,
        dest: &Path,
        extract: bool,
    ) -> Result<bool, ControllerError> {
        let tree = Self::tree_path(dest, tag);
        let mut fetched = Vec::new();

        for variant in &self.variants {
            let archive = dest.join(archive_name(tag, Some(variant)));
            if !self
                .store
                .download(component, tag, Some(variant), &archive)
                .await?
            {
                debug!(component, tag, variant = %variant, "Variant not available");
                continue;
            }

            // Later variants win on collision
            unpack_archive(&archive, &tree).await?;
            File::new(&archive).delete().await?;
            fetched.push(variant.clone());
        }

        if fetched.is_empty() {
            warn!(component, tag, "No release variant found, trying plain archive");
            return self.fetch_single(component, tag, dest, extract).await;
        }

        pack_directory(&tree, &Self::archive_path(dest, tag)).await?;
        if !extract {
            Dir::new(&tree).delete().await?;
        }

        info!(component, tag, variants = ?fetched, "Release fetched");
        Ok(true)
    }
}

/// Extract a `.tar.gz` archive into `dest`, overwriting existing files
pub async fn unpack_archive(archive: &Path, dest: &Path) -> Result<(), ControllerError> {
    let archive = archive.to_owned();
    let dest = dest.to_owned();
    spawn_blocking(move || unpack_archive_sync(&archive, &dest))
        .await
        .map_err(|e| ControllerError::Internal(format!("unpack task failed: {}", e)))??;
    Ok(())
}

/// Archive the contents of `src` as a `.tar.gz` at `archive`
pub async fn pack_directory(src: &Path, archive: &Path) -> Result<(), ControllerError> {
    let src = src.to_owned();
    let archive = archive.to_owned();
    spawn_blocking(move || pack_directory_sync(&src, &archive))
        .await
        .map_err(|e| ControllerError::Internal(format!("pack task failed: {}", e)))??;
    Ok(())
}

fn unpack_archive_sync(archive: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;

    let file = fs::File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);
    tar.unpack(dest)?;

    debug!("Unpacked {} into {}", archive.display(), dest.display());
    Ok(())
}

fn pack_directory_sync(src: &Path, archive: &Path) -> std::io::Result<()> {
    let file = fs::File::create(archive)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        if entry.file_type().is_dir() {
            builder.append_dir(relative, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), relative)?;
        }
    }

    builder.into_inner()?.finish()?.sync_all()?;
    debug!("Packed {} into {}", src.display(), archive.display());
    Ok(())
}
