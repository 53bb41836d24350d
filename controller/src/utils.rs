//! Build metadata

use serde::{Deserialize, Serialize};

/// Name reported by `/health` and in the `User-Agent` header
pub const SERVICE_NAME: &str = "deployctl";

/// Version information for the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub service: String,
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version of this build, as embedded by the build script
pub fn version_info() -> VersionInfo {
    VersionInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// `deployctl/<version> (<git hash>)`, sent to every collaborator
pub fn user_agent() -> String {
    let info = version_info();
    format!("{}/{} ({})", info.service, info.version, info.git_hash)
}
