//! Deployment classifier
//!
//! Decides which scenario a request falls into and computes, per facility,
//! the instances to provision:
//!
//! 1. no instances named: component-only, every requested facility maps to
//!    an empty set;
//! 2. instances and facilities named: every instance goes to every facility;
//! 3. instances without facilities: each instance goes to every known
//!    facility whose registry record lists it, and an instance found
//!    nowhere fails the whole request.
//!
//! "New component" is tracked per facility.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::errors::ControllerError;
use crate::models::plan::DeploymentPlan;
use crate::models::request::DeploymentRequest;
use crate::registry::RegistryExt;

/// Classify `request` against the registry.
///
/// `known_facilities` is every facility the controller deploys to.
pub async fn classify(
    registry: &dyn RegistryExt,
    request: &DeploymentRequest,
    known_facilities: &[String],
) -> Result<DeploymentPlan, ControllerError> {
    let (component, facilities, instances) = match request {
        DeploymentRequest::Component(r) => (&r.component_name, Some(&r.facilities), None),
        DeploymentRequest::Instance(r) => (
            &r.component_name,
            r.facilities.as_ref(),
            r.instance_names.as_ref().filter(|names| !names.is_empty()),
        ),
        DeploymentRequest::Revert(_) => {
            return Err(ControllerError::ValidationError(
                "revert requests must be planned before classification".to_string(),
            ));
        }
        DeploymentRequest::InitialRegistration(_) => {
            return Err(ControllerError::ValidationError(
                "initial registrations are not provisioned".to_string(),
            ));
        }
    };

    let facilities = match facilities {
        Some(facilities) if !facilities.is_empty() => {
            check_known(facilities, known_facilities)?;
            Some(facilities)
        }
        _ => None,
    };

    let plan = match (instances, facilities) {
        (None, Some(facilities)) => {
            debug!(component = %component, "Component-only deployment");
            explicit_plan(registry, component, facilities, &BTreeSet::new()).await?
        }
        (None, None) => {
            return Err(ControllerError::ClassificationError(format!(
                "no facilities or instances given for {}",
                component
            )));
        }
        (Some(instances), Some(facilities)) => {
            debug!(component = %component, "Targeted deployment with explicit facilities");
            let names = instances.iter().cloned().collect();
            explicit_plan(registry, component, facilities, &names).await?
        }
        (Some(instances), None) => {
            debug!(component = %component, "Deployment to existing instances");
            existing_instance_plan(registry, component, instances, known_facilities).await?
        }
    };

    info!(
        component = %component,
        facilities = ?plan.facility_instances.keys().collect::<Vec<_>>(),
        new_in = ?plan.new_in,
        "Request classified"
    );
    Ok(plan)
}

fn check_known(facilities: &[String], known: &[String]) -> Result<(), ControllerError> {
    match facilities.iter().find(|f| !known.contains(f)) {
        Some(unknown) => Err(ControllerError::ClassificationError(format!(
            "unknown facility {}",
            unknown
        ))),
        None => Ok(()),
    }
}

/// Rules 1 and 2: the caller named the facilities
async fn explicit_plan(
    registry: &dyn RegistryExt,
    component: &str,
    facilities: &[String],
    instances: &BTreeSet<String>,
) -> Result<DeploymentPlan, ControllerError> {
    let mut plan = DeploymentPlan::default();
    for facility in facilities {
        if registry.get_component(facility, component).await?.is_none() {
            plan.new_in.insert(facility.clone());
        }
        plan.facility_instances
            .insert(facility.clone(), instances.clone());
    }
    Ok(plan)
}

/// Rule 3: locate each instance through the registry
async fn existing_instance_plan(
    registry: &dyn RegistryExt,
    component: &str,
    instances: &[String],
    known_facilities: &[String],
) -> Result<DeploymentPlan, ControllerError> {
    let mut records = Vec::new();
    for facility in known_facilities {
        if let Some(record) = registry.get_component(facility, component).await? {
            records.push(record);
        }
    }

    let mut facility_instances: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for instance in instances {
        let mut found = false;
        for record in records.iter().filter(|r| r.has_instance(instance)) {
            facility_instances
                .entry(record.facility.clone())
                .or_default()
                .insert(instance.clone());
            found = true;
        }

        if !found {
            return Err(ControllerError::ClassificationError(format!(
                "instance {} of {} not found in any facility",
                instance, component
            )));
        }
    }

    Ok(DeploymentPlan {
        facility_instances,
        new_in: BTreeSet::new(),
    })
}
