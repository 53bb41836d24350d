//! Provisioning invoker
//!
//! Runs the external provisioning tool once per facility and captures its
//! output. The call is awaited to completion; no timeout is applied here.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::ControllerError;

/// One invocation of the provisioning tool
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionInvocation {
    pub inventory: PathBuf,
    pub playbook: PathBuf,
    /// Facility selector (`-l`)
    pub facility: String,
    pub extra_vars: Value,
    pub dry_run: bool,
}

/// Captured result of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProvisionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Provisioning tool port
#[async_trait]
pub trait ProvisionerExt: Send + Sync {
    async fn run(&self, invocation: &ProvisionInvocation) -> Result<ProvisionOutput, ControllerError>;
}

/// Invokes `ansible-playbook`
#[derive(Debug, Clone)]
pub struct AnsibleProvisioner {
    program: String,
}

impl AnsibleProvisioner {
    pub fn new() -> Self {
        Self {
            program: "ansible-playbook".to_string(),
        }
    }

    /// Use a different executable, e.g. a wrapper script
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Command-line arguments for `invocation`
    pub fn args(invocation: &ProvisionInvocation) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            invocation.inventory.display().to_string(),
            invocation.playbook.display().to_string(),
            "-l".to_string(),
            invocation.facility.clone(),
            "--extra-vars".to_string(),
            invocation.extra_vars.to_string(),
        ];
        if invocation.dry_run {
            args.push("--check".to_string());
        }
        args
    }
}

impl Default for AnsibleProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisionerExt for AnsibleProvisioner {
    async fn run(&self, invocation: &ProvisionInvocation) -> Result<ProvisionOutput, ControllerError> {
        let args = Self::args(invocation);
        info!(
            facility = %invocation.facility,
            playbook = %invocation.playbook.display(),
            dry_run = invocation.dry_run,
            "Running provisioning tool"
        );
        debug!("{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ControllerError::ProvisioningError(format!("Failed to run {}: {}", self.program, e))
            })?;

        // Killed by a signal
        let exit_code = output.status.code().unwrap_or(-1);
        let result = ProvisionOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
        };

        if !result.success() {
            warn!(facility = %invocation.facility, exit_code, "Provisioning failed");
        }
        Ok(result)
    }
}
