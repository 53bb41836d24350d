//! Instance plan entries derived from a release

use serde::{Deserialize, Serialize};

/// Startup template category for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartupTemplate {
    LinuxRtIoc,
    LinuxRtPeripheral,
    Rtems,
    SoftIoc,
    SoftPeripheral,
}

impl StartupTemplate {
    /// Select a template from the target architecture and instance folder name.
    ///
    /// Matching is case-insensitive.
    pub fn select(architecture: &str, instance_name: &str) -> Self {
        let arch = architecture.to_lowercase();
        let is_ioc = instance_name.to_lowercase().contains("ioc");

        if arch.contains("linuxrt") {
            if is_ioc {
                StartupTemplate::LinuxRtIoc
            } else {
                StartupTemplate::LinuxRtPeripheral
            }
        } else if arch.contains("rtems") {
            StartupTemplate::Rtems
        } else if is_ioc {
            StartupTemplate::SoftIoc
        } else {
            StartupTemplate::SoftPeripheral
        }
    }

    /// Template identifier passed to the provisioning tool.
    ///
    /// Soft peripherals carry the facility as a suffix.
    pub fn template_name(&self, facility: &str) -> String {
        match self {
            StartupTemplate::LinuxRtIoc => "linuxrt-ioc".to_string(),
            StartupTemplate::LinuxRtPeripheral => "linuxrt-peripheral".to_string(),
            StartupTemplate::Rtems => "rtems".to_string(),
            StartupTemplate::SoftIoc => "soft-ioc".to_string(),
            StartupTemplate::SoftPeripheral => {
                format!("soft-peripheral-{}", facility.to_lowercase())
            }
        }
    }
}

/// One instance found in an extracted release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePlanEntry {
    pub name: String,
    pub architecture: String,
    pub binary: String,
    pub startup_template: StartupTemplate,
}
