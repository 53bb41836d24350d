//! Registry and logbook models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One instance entry in a component's `dependsOn` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub tag: String,
}

/// A component as recorded in one facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    pub facility: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(rename = "dependsOn", default)]
    pub depends_on: Vec<Dependency>,
}

impl ComponentRecord {
    /// Create a record with no instances
    pub fn new(name: &str, facility: &str, tag: &str, component_type: &str) -> Self {
        Self {
            name: name.to_string(),
            facility: facility.to_string(),
            tag: tag.to_string(),
            component_type: component_type.to_string(),
            depends_on: Vec::new(),
        }
    }

    /// Whether `instance` is listed in `dependsOn`
    pub fn has_instance(&self, instance: &str) -> bool {
        self.depends_on.iter().any(|d| d.name == instance)
    }

    /// Tag recorded for `instance`, if listed
    pub fn instance_tag(&self, instance: &str) -> Option<&str> {
        self.depends_on
            .iter()
            .find(|d| d.name == instance)
            .map(|d| d.tag.as_str())
    }

    /// Insert or replace the dependency entry for `instance`.
    ///
    /// Entries stay unique by name.
    pub fn set_instance_tag(&mut self, instance: &str, tag: &str) {
        match self.depends_on.iter_mut().find(|d| d.name == instance) {
            Some(entry) => entry.tag = tag.to_string(),
            None => self.depends_on.push(Dependency {
                name: instance.to_string(),
                tag: tag.to_string(),
            }),
        }
    }
}

/// A deployment-history entry kept by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentHistoryEntry {
    pub component_name: String,
    pub facility: String,
    pub tag: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "dependsOn", default)]
    pub depends_on: Vec<Dependency>,
}

/// A free-text entry posted to the logbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogbookEntry {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
