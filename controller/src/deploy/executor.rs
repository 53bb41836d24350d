//! Deployment executor
//!
//! Runs the body of one accepted task: fetch and inspect the release,
//! provision each facility in turn, update the registry for every facility
//! that succeeded, then publish the report. A facility that fails does not
//! stop the others; the task still completes and the report carries the
//! overall failure.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use openapi_client::{ComponentRecord, DeploymentHistoryEntry};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::deploy::inspector;
use crate::deploy::provisioner::{ProvisionInvocation, ProvisionerExt};
use crate::deploy::release::ReleaseFetcher;
use crate::deploy::report::{DeploymentReport, FacilityOutcome, ReportPublisher};
use crate::errors::ControllerError;
use crate::models::instance::InstancePlanEntry;
use crate::models::plan::DeploymentPlan;
use crate::models::request::{DeploymentKind, DeploymentRequest};
use crate::registry::RegistryExt;
use crate::tasks::TaskEngine;

/// Playbook for IOC deployments, relative to the playbook root
pub const IOC_PLAYBOOK: &str = "ioc_deploy.yml";

/// Playbook for display deployments, relative to the playbook root
pub const DISPLAY_PLAYBOOK: &str = "display_deploy.yml";

/// Inventory file, relative to the playbook root
pub const INVENTORY: &str = "inventory.ini";

/// A classified request ready for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentJob {
    pub task_id: Uuid,
    pub kind: DeploymentKind,
    pub component_name: String,
    pub tag: String,
    pub user: String,
    pub dry_run: bool,
    pub component_type: String,
    pub plan: DeploymentPlan,
    /// Scratch directory owned by this task
    pub scratch_dir: PathBuf,
}

impl DeploymentJob {
    /// Build a job from a request that carries a tag
    pub fn new(
        task_id: Uuid,
        request: &DeploymentRequest,
        plan: DeploymentPlan,
        scratch_dir: PathBuf,
    ) -> Result<Self, ControllerError> {
        let tag = request.tag().ok_or_else(|| {
            ControllerError::ValidationError("a tag is required to deploy".to_string())
        })?;

        let kind = if request.component_type() == DeploymentKind::Display.as_str() {
            DeploymentKind::Display
        } else {
            DeploymentKind::Ioc
        };

        Ok(Self {
            task_id,
            kind,
            component_name: request.component_name().to_string(),
            tag: tag.to_string(),
            user: request.user().to_string(),
            dry_run: request.dry_run(),
            component_type: request.component_type().to_string(),
            plan,
            scratch_dir,
        })
    }
}

/// Percent reported when starting facility `index` of `total`
fn facility_percent(index: usize, total: usize) -> u8 {
    (25 + 60 * index / total.max(1)) as u8
}

pub struct DeploymentExecutor {
    tasks: Arc<TaskEngine>,
    registry: Arc<dyn RegistryExt>,
    fetcher: ReleaseFetcher,
    provisioner: Arc<dyn ProvisionerExt>,
    publisher: ReportPublisher,
    playbook_root: PathBuf,
}

impl DeploymentExecutor {
    pub fn new(
        tasks: Arc<TaskEngine>,
        registry: Arc<dyn RegistryExt>,
        fetcher: ReleaseFetcher,
        provisioner: Arc<dyn ProvisionerExt>,
        publisher: ReportPublisher,
        playbook_root: PathBuf,
    ) -> Self {
        Self {
            tasks,
            registry,
            fetcher,
            provisioner,
            publisher,
            playbook_root,
        }
    }

    pub fn tasks(&self) -> &Arc<TaskEngine> {
        &self.tasks
    }

    /// Execute `job` to a terminal state.
    ///
    /// Any error escaping the pipeline fails the task with its message.
    pub async fn run(&self, job: &DeploymentJob) {
        info!(
            task_id = %job.task_id,
            component = %job.component_name,
            tag = %job.tag,
            kind = job.kind.as_str(),
            dry_run = job.dry_run,
            "Executing deployment"
        );

        if let Err(e) = self.execute(job).await {
            error!(task_id = %job.task_id, "Deployment failed: {}", e);
            if let Err(e) = self.tasks.fail(&job.task_id, &e.to_string()).await {
                error!(task_id = %job.task_id, "Unable to record failure: {}", e);
            }
        }
    }

    async fn execute(&self, job: &DeploymentJob) -> Result<(), ControllerError> {
        let outcomes = match job.kind {
            DeploymentKind::Ioc => self.execute_ioc(job).await?,
            DeploymentKind::Display => self.execute_display(job).await?,
        };

        self.tasks
            .update_progress(&job.task_id, "Generating report", 90, None)
            .await?;

        let report = DeploymentReport {
            component: job.component_name.clone(),
            tag: job.tag.clone(),
            user: job.user.clone(),
            dry_run: job.dry_run,
            new_in: job.plan.new_in.iter().cloned().collect(),
            outcomes,
        };
        let result = self.publisher.publish(&job.task_id, &report).await?;
        self.tasks.complete(&job.task_id, result).await
    }

    async fn execute_ioc(&self, job: &DeploymentJob) -> Result<Vec<FacilityOutcome>, ControllerError> {
        self.tasks
            .update_progress(&job.task_id, "Fetching release", 10, None)
            .await?;

        let fetched = self
            .fetcher
            .fetch(&job.component_name, &job.tag, &job.scratch_dir, true, true)
            .await?;
        if !fetched {
            return Err(ControllerError::ArtifactNotFound(format!(
                "{} {}",
                job.component_name, job.tag
            )));
        }

        self.tasks
            .update_progress(&job.task_id, "Inspecting release", 25, None)
            .await?;

        let tree = ReleaseFetcher::tree_path(&job.scratch_dir, &job.tag);
        let release = inspector::inspect(&tree).await?;
        debug!(task_id = %job.task_id, instances = release.len(), "Release inspected");

        let tarball = ReleaseFetcher::archive_path(&job.scratch_dir, &job.tag);
        self.fan_out(job, |facility, instances| {
            Self::select_instances(&release, facility, instances).map(|entries| {
                json!({
                    "tarball": tarball.display().to_string(),
                    "instances": entries,
                })
            })
        })
        .await
    }

    async fn execute_display(
        &self,
        job: &DeploymentJob,
    ) -> Result<Vec<FacilityOutcome>, ControllerError> {
        self.fan_out(job, |_, _| Ok(json!({}))).await
    }

    /// Instance entries for `facility`, or the names missing from the release
    fn select_instances(
        release: &[InstancePlanEntry],
        facility: &str,
        wanted: &BTreeSet<String>,
    ) -> Result<Vec<serde_json::Value>, String> {
        let missing: Vec<&str> = wanted
            .iter()
            .filter(|name| !release.iter().any(|e| &e.name == *name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "instances not found in release: {}",
                missing.join(", ")
            ));
        }

        Ok(release
            .iter()
            .filter(|e| wanted.contains(&e.name))
            .map(|e| {
                json!({
                    "name": e.name,
                    "architecture": e.architecture,
                    "binary": e.binary,
                    "startup_template": e.startup_template.template_name(facility),
                })
            })
            .collect())
    }

    /// Provision each planned facility in order.
    ///
    /// `kind_vars` adds the kind-specific extra vars for one facility, or
    /// explains why that facility cannot be provisioned.
    async fn fan_out<V>(
        &self,
        job: &DeploymentJob,
        kind_vars: V,
    ) -> Result<Vec<FacilityOutcome>, ControllerError>
    where
        V: Fn(&str, &BTreeSet<String>) -> Result<serde_json::Value, String>,
    {
        let facilities: Vec<&String> = job.plan.facilities().collect();
        let empty = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(facilities.len());

        for (index, facility) in facilities.iter().enumerate() {
            let instances = job.plan.instances(facility).unwrap_or(&empty);
            self.tasks
                .update_progress(
                    &job.task_id,
                    &format!("Deploying to {}", facility),
                    facility_percent(index, facilities.len()),
                    None,
                )
                .await?;

            let outcome = match kind_vars(facility, instances) {
                Ok(vars) => self.deploy_facility(job, facility, instances, vars).await?,
                Err(reason) => {
                    warn!(task_id = %job.task_id, facility = %facility, "{}", reason);
                    FacilityOutcome {
                        facility: facility.to_string(),
                        instances: instances.iter().cloned().collect(),
                        success: false,
                        output: reason,
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn deploy_facility(
        &self,
        job: &DeploymentJob,
        facility: &str,
        instances: &BTreeSet<String>,
        kind_vars: serde_json::Value,
    ) -> Result<FacilityOutcome, ControllerError> {
        let mut extra_vars = json!({
            "component_name": job.component_name,
            "tag": job.tag,
            "user": job.user,
            "facility": facility,
            "new_component": job.plan.is_new_in(facility),
        });
        if let (Some(vars), serde_json::Value::Object(extra)) = (extra_vars.as_object_mut(), kind_vars) {
            vars.extend(extra);
        }

        let playbook = match job.kind {
            DeploymentKind::Ioc => IOC_PLAYBOOK,
            DeploymentKind::Display => DISPLAY_PLAYBOOK,
        };
        let invocation = ProvisionInvocation {
            inventory: self.playbook_root.join(INVENTORY),
            playbook: self.playbook_root.join(playbook),
            facility: facility.to_string(),
            extra_vars,
            dry_run: job.dry_run,
        };

        let instance_names: Vec<String> = instances.iter().cloned().collect();
        let output = match self.provisioner.run(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                warn!(task_id = %job.task_id, facility, "Provisioning did not run: {}", e);
                return Ok(FacilityOutcome {
                    facility: facility.to_string(),
                    instances: instance_names,
                    success: false,
                    output: e.to_string(),
                });
            }
        };

        let success = output.success();
        let mut text = output.stdout;
        if !success {
            text.push_str(&format!("\nexit code {}\n{}", output.exit_code, output.stderr));
        }

        if success && !job.dry_run {
            self.record(job, facility, instances).await?;
        }

        Ok(FacilityOutcome {
            facility: facility.to_string(),
            instances: instance_names,
            success,
            output: text,
        })
    }

    /// Upsert the facility's component record and append a history entry
    async fn record(
        &self,
        job: &DeploymentJob,
        facility: &str,
        instances: &BTreeSet<String>,
    ) -> Result<(), ControllerError> {
        let mut record = match self
            .registry
            .get_component(facility, &job.component_name)
            .await?
        {
            Some(record) => record,
            None => {
                info!(component = %job.component_name, facility, "Registering new component");
                ComponentRecord::new(&job.component_name, facility, &job.tag, &job.component_type)
            }
        };

        record.tag = job.tag.clone();
        for instance in instances {
            record.set_instance_tag(instance, &job.tag);
        }
        self.registry.put_component(&record).await?;

        let entry = DeploymentHistoryEntry {
            component_name: job.component_name.clone(),
            facility: facility.to_string(),
            tag: job.tag.clone(),
            user: job.user.clone(),
            timestamp: Utc::now(),
            depends_on: record.depends_on,
        };
        self.registry.record_deployment(&entry).await?;

        debug!(component = %job.component_name, facility, "Registry updated");
        Ok(())
    }
}
