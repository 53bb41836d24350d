//! Deployment request variants
//!
//! Inbound JSON bodies are validated into one of these variants at the
//! HTTP boundary; nothing past the handlers sees raw request shapes.

use openapi_server::{DisplayDeploymentBody, InitialDeploymentBody, IocDeploymentBody, RevertBody};
use serde::{Deserialize, Serialize};

use crate::errors::ControllerError;

/// What is being deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentKind {
    /// IOC-style release with per-instance provisioning
    Ioc,
    /// Display/screen bundle, provisioned per facility only
    Display,
}

impl DeploymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentKind::Ioc => "ioc",
            DeploymentKind::Display => "display",
        }
    }
}

/// Deploy a component to explicit facilities, no instances listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRequest {
    pub component_name: String,
    pub facilities: Vec<String>,
    pub tag: String,
    pub user: String,
    pub dry_run: bool,
    pub component_type: String,
}

/// Deploy named instances, optionally to explicit facilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub component_name: String,
    pub facilities: Option<Vec<String>>,
    pub tag: String,
    pub instance_names: Option<Vec<String>>,
    pub user: String,
    pub dry_run: bool,
    pub component_type: String,
}

/// Restore the previous tag for what changed in the last deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertRequest {
    pub component_name: String,
    pub facility: String,
    pub instance_names: Option<Vec<String>>,
    pub user: String,
}

/// Write a registry record without provisioning anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialRegistrationRequest {
    pub component_name: String,
    pub facility: String,
    pub tag: String,
    pub instance_names: Option<Vec<String>>,
    pub user: String,
    pub component_type: String,
}

/// A validated deployment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentRequest {
    Component(ComponentRequest),
    Instance(InstanceRequest),
    Revert(RevertRequest),
    InitialRegistration(InitialRegistrationRequest),
}

impl DeploymentRequest {
    pub fn component_name(&self) -> &str {
        match self {
            DeploymentRequest::Component(r) => &r.component_name,
            DeploymentRequest::Instance(r) => &r.component_name,
            DeploymentRequest::Revert(r) => &r.component_name,
            DeploymentRequest::InitialRegistration(r) => &r.component_name,
        }
    }

    pub fn user(&self) -> &str {
        match self {
            DeploymentRequest::Component(r) => &r.user,
            DeploymentRequest::Instance(r) => &r.user,
            DeploymentRequest::Revert(r) => &r.user,
            DeploymentRequest::InitialRegistration(r) => &r.user,
        }
    }

    /// Tag to deploy; reverts have none until planned
    pub fn tag(&self) -> Option<&str> {
        match self {
            DeploymentRequest::Component(r) => Some(&r.tag),
            DeploymentRequest::Instance(r) => Some(&r.tag),
            DeploymentRequest::Revert(_) => None,
            DeploymentRequest::InitialRegistration(r) => Some(&r.tag),
        }
    }

    pub fn dry_run(&self) -> bool {
        match self {
            DeploymentRequest::Component(r) => r.dry_run,
            DeploymentRequest::Instance(r) => r.dry_run,
            DeploymentRequest::Revert(_) | DeploymentRequest::InitialRegistration(_) => false,
        }
    }

    pub fn component_type(&self) -> &str {
        match self {
            DeploymentRequest::Component(r) => &r.component_type,
            DeploymentRequest::Instance(r) => &r.component_type,
            DeploymentRequest::Revert(_) => DeploymentKind::Ioc.as_str(),
            DeploymentRequest::InitialRegistration(r) => &r.component_type,
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ControllerError> {
    if value.trim().is_empty() {
        return Err(ControllerError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Names end up as path segments under scratch and reports directories
fn path_safe(field: &str, value: &str) -> Result<(), ControllerError> {
    require(field, value)?;
    if value.contains(['/', '\\'])
        || value.contains("..")
        || value.chars().any(char::is_control)
    {
        return Err(ControllerError::ValidationError(format!(
            "{} contains invalid characters: {:?}",
            field, value
        )));
    }
    Ok(())
}

/// Drop blanks; `None` when nothing remains
fn non_empty(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values
        .map(|v| {
            v.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
}

fn all_path_safe(field: &str, values: Option<&Vec<String>>) -> Result<(), ControllerError> {
    values
        .into_iter()
        .flatten()
        .try_for_each(|value| path_safe(field, value))
}

impl TryFrom<IocDeploymentBody> for DeploymentRequest {
    type Error = ControllerError;

    fn try_from(body: IocDeploymentBody) -> Result<Self, Self::Error> {
        path_safe("component_name", &body.component_name)?;
        path_safe("tag", &body.tag)?;
        require("user", &body.user)?;
        if body.component_type == DeploymentKind::Display.as_str() {
            return Err(ControllerError::ValidationError(
                "display components are deployed through the display endpoint".to_string(),
            ));
        }

        let facilities = non_empty(body.facilities);
        all_path_safe("facilities", facilities.as_ref())?;
        let instance_names = non_empty(body.instance_names);
        all_path_safe("instance_names", instance_names.as_ref())?;

        match instance_names {
            None => {
                let facilities = facilities.ok_or_else(|| {
                    ControllerError::ValidationError(
                        "facilities are required when no instances are given".to_string(),
                    )
                })?;
                Ok(DeploymentRequest::Component(ComponentRequest {
                    component_name: body.component_name,
                    facilities,
                    tag: body.tag,
                    user: body.user,
                    dry_run: body.dry_run,
                    component_type: body.component_type,
                }))
            }
            Some(instance_names) => Ok(DeploymentRequest::Instance(InstanceRequest {
                component_name: body.component_name,
                facilities,
                tag: body.tag,
                instance_names: Some(instance_names),
                user: body.user,
                dry_run: body.dry_run,
                component_type: body.component_type,
            })),
        }
    }
}

impl TryFrom<DisplayDeploymentBody> for DeploymentRequest {
    type Error = ControllerError;

    fn try_from(body: DisplayDeploymentBody) -> Result<Self, Self::Error> {
        path_safe("component_name", &body.component_name)?;
        path_safe("tag", &body.tag)?;
        require("user", &body.user)?;

        let facilities = non_empty(Some(body.facilities)).ok_or_else(|| {
            ControllerError::ValidationError("at least one facility is required".to_string())
        })?;
        all_path_safe("facilities", Some(&facilities))?;

        Ok(DeploymentRequest::Component(ComponentRequest {
            component_name: body.component_name,
            facilities,
            tag: body.tag,
            user: body.user,
            dry_run: body.dry_run,
            component_type: DeploymentKind::Display.as_str().to_string(),
        }))
    }
}

impl TryFrom<RevertBody> for DeploymentRequest {
    type Error = ControllerError;

    fn try_from(body: RevertBody) -> Result<Self, Self::Error> {
        path_safe("component_name", &body.component_name)?;
        path_safe("facility", &body.facility)?;
        require("user", &body.user)?;
        let instance_names = non_empty(body.instance_names);
        all_path_safe("instance_names", instance_names.as_ref())?;

        Ok(DeploymentRequest::Revert(RevertRequest {
            component_name: body.component_name,
            facility: body.facility,
            instance_names,
            user: body.user,
        }))
    }
}

impl TryFrom<InitialDeploymentBody> for DeploymentRequest {
    type Error = ControllerError;

    fn try_from(body: InitialDeploymentBody) -> Result<Self, Self::Error> {
        path_safe("component_name", &body.component_name)?;
        path_safe("facility", &body.facility)?;
        path_safe("tag", &body.tag)?;
        require("user", &body.user)?;
        let instance_names = non_empty(body.instance_names);
        all_path_safe("instance_names", instance_names.as_ref())?;

        Ok(DeploymentRequest::InitialRegistration(
            InitialRegistrationRequest {
                component_name: body.component_name,
                facility: body.facility,
                tag: body.tag,
                instance_names,
                user: body.user,
                component_type: body.component_type,
            },
        ))
    }
}
