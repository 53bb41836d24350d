//! Report and audit generator

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use openapi_client::LogbookEntry;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ControllerError;
use crate::filesys::dir::Dir;
use crate::http::logbook::LogbookExt;
use crate::models::task::TaskResult;

/// What happened in one facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityOutcome {
    pub facility: String,
    pub instances: Vec<String>,
    pub success: bool,
    /// Captured provisioning output or the failure reason
    pub output: String,
}

/// Everything a deployment report is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub component: String,
    pub tag: String,
    pub user: String,
    pub dry_run: bool,
    /// Facilities where the component had no registry record yet
    pub new_in: Vec<String>,
    pub outcomes: Vec<FacilityOutcome>,
}

impl DeploymentReport {
    /// True when at least one facility ran and none failed
    pub fn success(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.success)
    }

    pub fn facilities(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.facility.as_str()).collect()
    }

    /// Logbook title, searchable by component, tag and facilities
    pub fn title(&self) -> String {
        format!(
            "{} {} deployment to {}",
            self.component,
            self.tag,
            self.facilities().join(", ")
        )
    }
}

fn status_label(success: bool) -> &'static str {
    if success {
        "SUCCESS"
    } else {
        "FAILED"
    }
}

/// Render the human-readable report; a pure function of `report`
pub fn generate_report(report: &DeploymentReport) -> String {
    let mut text = String::new();

    let _ = writeln!(text, "Deployment report");
    let _ = writeln!(text, "Component: {}", report.component);
    let _ = writeln!(text, "Tag: {}", report.tag);
    let _ = writeln!(text, "User: {}", report.user);
    if report.dry_run {
        let _ = writeln!(text, "Mode: DRY RUN (no changes were recorded)");
    }
    let _ = writeln!(text, "Facilities: {}", report.facilities().join(", "));
    if !report.new_in.is_empty() {
        let _ = writeln!(text, "New component in: {}", report.new_in.join(", "));
    }
    let _ = writeln!(text, "Overall status: {}", status_label(report.success()));

    for outcome in &report.outcomes {
        let _ = writeln!(text);
        let _ = writeln!(
            text,
            "=== {}: {} ===",
            outcome.facility,
            status_label(outcome.success)
        );
        if !outcome.instances.is_empty() {
            let _ = writeln!(text, "Instances: {}", outcome.instances.join(", "));
        }
        let output = outcome.output.trim_end();
        if !output.is_empty() {
            let _ = writeln!(text, "{}", output);
        }
    }

    text
}

fn report_file_name(component: &str, tag: &str, task_id: &Uuid) -> String {
    format!("{}-{}-{}.log", component, tag, task_id)
}

/// Writes reports to disk and forwards them to the logbook
pub struct ReportPublisher {
    reports_dir: Dir,
    logbook: Arc<dyn LogbookExt>,
}

impl ReportPublisher {
    pub fn new(reports_dir: Dir, logbook: Arc<dyn LogbookExt>) -> Self {
        Self {
            reports_dir,
            logbook,
        }
    }

    /// `<reports_dir>/<component>-<tag>-<task_id>.log`
    pub fn report_path(&self, component: &str, tag: &str, task_id: &Uuid) -> PathBuf {
        self.reports_dir.path().join(report_file_name(component, tag, task_id))
    }

    /// Write the report file and, unless dry-run, post it to the logbook.
    ///
    /// A logbook failure is logged only; it never fails the deployment.
    pub async fn publish(
        &self,
        task_id: &Uuid,
        report: &DeploymentReport,
    ) -> Result<TaskResult, ControllerError> {
        let text = generate_report(report);
        let path = self.report_path(&report.component, &report.tag, task_id);

        self.reports_dir
            .file(&report_file_name(&report.component, &report.tag, task_id))
            .write_atomic(text.as_bytes())
            .await?;
        info!(task_id = %task_id, path = %path.display(), "Report written");

        if report.dry_run {
            info!(task_id = %task_id, "Dry run, logbook entry skipped");
        } else {
            let mut tags = vec![report.component.clone()];
            tags.extend(report.facilities().into_iter().map(str::to_string));
            let entry = LogbookEntry {
                title: report.title(),
                text: text.clone(),
                tags,
            };
            if let Err(e) = self.logbook.post_entry(&entry).await {
                warn!(task_id = %task_id, "Failed to post logbook entry: {}", e);
            }
        }

        Ok(TaskResult {
            success: report.success(),
            report: text,
            report_path: path,
        })
    }
}
