//! Shared fakes for the collaborator ports

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use openapi_client::{ComponentRecord, LogbookEntry};

use deployctl::deploy::executor::DeploymentExecutor;
use deployctl::deploy::provisioner::{ProvisionInvocation, ProvisionOutput, ProvisionerExt};
use deployctl::deploy::release::ReleaseFetcher;
use deployctl::deploy::report::ReportPublisher;
use deployctl::errors::ControllerError;
use deployctl::filesys::dir::Dir;
use deployctl::http::logbook::LogbookExt;
use deployctl::http::releases::{archive_name, ReleaseStoreExt};
use deployctl::registry::{MemoryRegistry, RegistryExt};
use deployctl::tasks::{MemoryTaskStore, TaskEngine};

pub const FACILITIES: [&str; 3] = ["F1", "F2", "F3"];

pub fn facilities() -> Vec<String> {
    FACILITIES.iter().map(|f| f.to_string()).collect()
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Registry record with `instances` all at `tag`
pub fn record(name: &str, facility: &str, tag: &str, instances: &[&str]) -> ComponentRecord {
    let mut record = ComponentRecord::new(name, facility, tag, "ioc");
    for instance in instances {
        record.set_instance_tag(instance, tag);
    }
    record
}

// ================================= ARCHIVES ===================================== //

/// Build a gzip'd tarball from `(path, contents)` pairs
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// `st.cmd` contents for an instance built for `arch`
pub fn st_cmd(arch: &str, binary: &str) -> String {
    format!("#!../../bin/{}/{}\n< envPaths\n", arch, binary)
}

/// A release with one `iocBoot/<name>/st.cmd` per instance
pub fn ioc_release(instances: &[&str]) -> Vec<u8> {
    let descriptors: Vec<(String, String)> = instances
        .iter()
        .map(|name| {
            (
                format!("iocBoot/{}/st.cmd", name),
                st_cmd("linux-x86_64", "alpha"),
            )
        })
        .collect();
    let files: Vec<(&str, &str)> = descriptors
        .iter()
        .map(|(path, contents)| (path.as_str(), contents.as_str()))
        .collect();
    tar_gz(&files)
}

// ============================== RELEASE STORE =================================== //

/// Release store serving archives from memory
#[derive(Default)]
pub struct FakeReleaseStore {
    archives: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl FakeReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, component: &str, tag: &str, variant: Option<&str>, bytes: Vec<u8>) {
        self.archives
            .lock()
            .unwrap()
            .insert((component.to_string(), archive_name(tag, variant)), bytes);
    }

    fn lookup(&self, component: &str, tag: &str, variant: Option<&str>) -> Option<Vec<u8>> {
        self.archives
            .lock()
            .unwrap()
            .get(&(component.to_string(), archive_name(tag, variant)))
            .cloned()
    }
}

#[async_trait]
impl ReleaseStoreExt for FakeReleaseStore {
    async fn exists(
        &self,
        component: &str,
        tag: &str,
        variant: Option<&str>,
    ) -> Result<bool, ControllerError> {
        Ok(self.lookup(component, tag, variant).is_some())
    }

    async fn download(
        &self,
        component: &str,
        tag: &str,
        variant: Option<&str>,
        dest: &Path,
    ) -> Result<bool, ControllerError> {
        match self.lookup(component, tag, variant) {
            Some(bytes) => {
                tokio::fs::write(dest, bytes).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ================================= LOGBOOK ====================================== //

#[derive(Default)]
pub struct FakeLogbook {
    entries: Mutex<Vec<LogbookEntry>>,
    failing: bool,
}

impl FakeLogbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A logbook that rejects every post
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn entries(&self) -> Vec<LogbookEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogbookExt for FakeLogbook {
    async fn post_entry(&self, entry: &LogbookEntry) -> Result<(), ControllerError> {
        if self.failing {
            return Err(ControllerError::LogbookError("logbook offline".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

// =============================== PROVISIONER ==================================== //

/// Records invocations; exits 0 unless a facility is told to fail
#[derive(Default)]
pub struct FakeProvisioner {
    exit_codes: Mutex<HashMap<String, i32>>,
    invocations: Mutex<Vec<ProvisionInvocation>>,
    delay: Option<Duration>,
    panics: bool,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation takes `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Every invocation panics
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }

    pub fn fail_facility(&self, facility: &str, exit_code: i32) {
        self.exit_codes
            .lock()
            .unwrap()
            .insert(facility.to_string(), exit_code);
    }

    pub fn invocations(&self) -> Vec<ProvisionInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProvisionerExt for FakeProvisioner {
    async fn run(&self, invocation: &ProvisionInvocation) -> Result<ProvisionOutput, ControllerError> {
        if self.panics {
            panic!("provisioner exploded");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.invocations.lock().unwrap().push(invocation.clone());

        let exit_code = self
            .exit_codes
            .lock()
            .unwrap()
            .get(&invocation.facility)
            .copied()
            .unwrap_or(0);
        Ok(ProvisionOutput {
            stdout: format!("PLAY RECAP {}\n", invocation.facility),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                "fatal: unreachable".to_string()
            },
            exit_code,
        })
    }
}

// ================================= HARNESS ====================================== //

/// An executor wired to in-memory fakes under a temporary directory
pub struct Harness {
    pub root: tempfile::TempDir,
    pub tasks: Arc<TaskEngine>,
    pub registry: Arc<MemoryRegistry>,
    pub releases: Arc<FakeReleaseStore>,
    pub fetcher: ReleaseFetcher,
    pub logbook: Arc<FakeLogbook>,
    pub provisioner: Arc<FakeProvisioner>,
    pub executor: Arc<DeploymentExecutor>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeProvisioner::new(), FakeLogbook::new(), Duration::from_secs(300))
    }

    pub fn with(provisioner: FakeProvisioner, logbook: FakeLogbook, task_ttl: Duration) -> Self {
        let root = tempfile::tempdir().unwrap();
        let tasks = Arc::new(TaskEngine::new(Arc::new(MemoryTaskStore::new()), task_ttl));
        let registry = Arc::new(MemoryRegistry::new());
        let releases = Arc::new(FakeReleaseStore::new());
        let fetcher = ReleaseFetcher::new(releases.clone(), names(&["rhel7", "rocky9"]));
        let logbook = Arc::new(logbook);
        let provisioner = Arc::new(provisioner);

        let registry_port: Arc<dyn RegistryExt> = registry.clone();
        let executor = Arc::new(DeploymentExecutor::new(
            tasks.clone(),
            registry_port,
            fetcher.clone(),
            provisioner.clone(),
            ReportPublisher::new(Dir::new(root.path().join("reports")), logbook.clone()),
            root.path().join("playbooks"),
        ));

        Self {
            root,
            tasks,
            registry,
            releases,
            fetcher,
            logbook,
            provisioner,
            executor,
        }
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.root.path().join("scratch")
    }
}
