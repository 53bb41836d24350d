//! Revert planner
//!
//! Compares the two most recent history entries for a component in one
//! facility and proposes a deployment that restores the previous tag for
//! just the instances that changed.

use std::collections::{BTreeMap, BTreeSet};

use openapi_client::{DeploymentHistoryEntry, Dependency};
use tracing::{debug, info};

use crate::errors::ControllerError;
use crate::models::request::{DeploymentKind, InstanceRequest, RevertRequest};
use crate::registry::RegistryExt;

fn tags_by_name(deps: &[Dependency]) -> BTreeMap<&str, &str> {
    deps.iter().map(|d| (d.name.as_str(), d.tag.as_str())).collect()
}

/// Instances whose tag differs between `current` and `previous`.
///
/// An instance present in only one of the two counts as changed.
pub fn diff_deployments(
    current: &DeploymentHistoryEntry,
    previous: &DeploymentHistoryEntry,
) -> BTreeSet<String> {
    let current = tags_by_name(&current.depends_on);
    let previous = tags_by_name(&previous.depends_on);

    current
        .keys()
        .chain(previous.keys())
        .filter(|name| current.get(*name) != previous.get(*name))
        .map(|name| name.to_string())
        .collect()
}

/// Plan a revert for `request`.
///
/// `None` when there is nothing to revert to: fewer than two history
/// entries, or no changed instance left after the optional filter.
pub async fn plan_revert(
    registry: &dyn RegistryExt,
    request: &RevertRequest,
) -> Result<Option<InstanceRequest>, ControllerError> {
    let history = registry
        .deployment_history(&request.component_name, &request.facility, 2)
        .await?;

    let (current, previous) = match history.as_slice() {
        [current, previous, ..] => (current, previous),
        _ => {
            debug!(
                component = %request.component_name,
                facility = %request.facility,
                entries = history.len(),
                "Not enough history to revert"
            );
            return Ok(None);
        }
    };

    let mut changed = diff_deployments(current, previous);
    if let Some(filter) = &request.instance_names {
        changed.retain(|name| filter.contains(name));
    }

    if changed.is_empty() {
        debug!(component = %request.component_name, "Nothing changed, no revert needed");
        return Ok(None);
    }

    info!(
        component = %request.component_name,
        facility = %request.facility,
        from = %current.tag,
        to = %previous.tag,
        instances = ?changed,
        "Revert planned"
    );

    Ok(Some(InstanceRequest {
        component_name: request.component_name.clone(),
        facilities: Some(vec![request.facility.clone()]),
        tag: previous.tag.clone(),
        instance_names: Some(changed.into_iter().collect()),
        user: request.user.clone(),
        dry_run: false,
        component_type: DeploymentKind::Ioc.as_str().to_string(),
    }))
}
