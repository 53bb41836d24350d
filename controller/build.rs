//! Build script for the deployment controller
//!
//! Embeds the git revision and build time reported by `--version` and
//! `/health`. `DEPLOYCTL_GIT_HASH` overrides the revision for builds made
//! outside a git checkout, e.g. from a source tarball.

use std::env;
use std::process::Command;

use chrono::Utc;

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    let revision = revision.trim();
    (!revision.is_empty()).then(|| revision.to_string())
}

fn main() {
    let git_hash = env::var("DEPLOYCTL_GIT_HASH")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());
    let build_time = Utc::now().to_rfc3339();

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-env-changed=DEPLOYCTL_GIT_HASH");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
