//! Instance inspector
//!
//! Finds instance directories (children of any `iocBoot` directory) in an
//! extracted release and reads each `st.cmd` interpreter line, e.g.
//! `#!../../bin/linuxRT-x86_64/alpha`, to recover architecture and binary.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::ControllerError;
use crate::models::instance::{InstancePlanEntry, StartupTemplate};

/// Directory holding one subdirectory per instance
pub const BOOT_DIR: &str = "iocBoot";

/// Startup descriptor expected in each instance directory
pub const STARTUP_FILE: &str = "st.cmd";

/// Expected prefix of the descriptor's first line
pub const INTERPRETER_PREFIX: &str = "#!";

/// Inspect an extracted release tree.
///
/// Never fails on malformed descriptors: directories without `st.cmd` are
/// skipped and bad interpreter lines are logged and left out.
pub async fn inspect(extracted_root: &Path) -> Result<Vec<InstancePlanEntry>, ControllerError> {
    let root = extracted_root.to_path_buf();
    tokio::task::spawn_blocking(move || inspect_sync(&root))
        .await
        .map_err(|e| ControllerError::Internal(format!("inspector task failed: {}", e)))
}

fn inspect_sync(root: &Path) -> Vec<InstancePlanEntry> {
    let mut entries: Vec<InstancePlanEntry> = instance_dirs(root)
        .into_iter()
        .filter_map(|dir| inspect_instance(&dir))
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries.dedup_by(|a, b| a.name == b.name);
    entries
}

fn instance_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir() && entry.depth() > 0)
        .filter(|entry| {
            entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|name| name == BOOT_DIR)
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn inspect_instance(dir: &Path) -> Option<InstancePlanEntry> {
    let name = dir.file_name()?.to_string_lossy().to_string();
    let descriptor = dir.join(STARTUP_FILE);
    if !descriptor.is_file() {
        debug!("Skipping {}: no {}", dir.display(), STARTUP_FILE);
        return None;
    }

    let first_line = match read_first_line(&descriptor) {
        Ok(line) => line,
        Err(e) => {
            warn!("Unable to read {}: {}", descriptor.display(), e);
            return None;
        }
    };

    match parse_interpreter_line(&first_line) {
        Some((architecture, binary)) => Some(InstancePlanEntry {
            startup_template: StartupTemplate::select(&architecture, &name),
            name,
            architecture,
            binary,
        }),
        None => {
            warn!(
                "Excluding {}: unexpected first line in {}: {:?}",
                name,
                descriptor.display(),
                first_line
            );
            None
        }
    }
}

fn read_first_line(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

/// Extract `(architecture, binary)` from a `#!.../bin/<arch>/<binary>` line
pub fn parse_interpreter_line(line: &str) -> Option<(String, String)> {
    let path = line.strip_prefix(INTERPRETER_PREFIX)?.trim();
    // Drop interpreter arguments, if any
    let path = path.split_whitespace().next()?;

    let parts: Vec<&str> = path.split('/').collect();
    let bin = parts.iter().rposition(|p| *p == "bin")?;
    match parts.get(bin + 1..) {
        Some([architecture, binary]) if !architecture.is_empty() && !binary.is_empty() => {
            Some((architecture.to_string(), binary.to_string()))
        }
        _ => None,
    }
}
