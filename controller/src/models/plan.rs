//! Facility to instance plan

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Which instances go to which facility, and where the component is new
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Facility name to instance names; an empty set means component-only
    pub facility_instances: BTreeMap<String, BTreeSet<String>>,

    /// Facilities with no registry record for the component yet
    pub new_in: BTreeSet<String>,
}

impl DeploymentPlan {
    /// Facilities in deployment order
    pub fn facilities(&self) -> impl Iterator<Item = &String> {
        self.facility_instances.keys()
    }

    /// Instances planned for `facility`
    pub fn instances(&self, facility: &str) -> Option<&BTreeSet<String>> {
        self.facility_instances.get(facility)
    }

    /// Whether the component has no record in `facility`
    pub fn is_new_in(&self, facility: &str) -> bool {
        self.new_in.contains(facility)
    }

    /// Whether the component is new in any planned facility
    pub fn is_new_component(&self) -> bool {
        !self.new_in.is_empty()
    }

    /// Every instance named anywhere in the plan
    pub fn all_instances(&self) -> BTreeSet<String> {
        self.facility_instances
            .values()
            .flat_map(|names| names.iter().cloned())
            .collect()
    }
}
