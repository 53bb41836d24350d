//! Revert planner tests

use chrono::{Duration, Utc};
use openapi_client::{Dependency, DeploymentHistoryEntry};

use deployctl::deploy::revert::plan_revert;
use deployctl::models::request::RevertRequest;
use deployctl::registry::MemoryRegistry;

use crate::support::names;

fn entry(tag: &str, minutes_ago: i64, deps: &[(&str, &str)]) -> DeploymentHistoryEntry {
    DeploymentHistoryEntry {
        component_name: "alpha".to_string(),
        facility: "F1".to_string(),
        tag: tag.to_string(),
        user: "op".to_string(),
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        depends_on: deps
            .iter()
            .map(|(name, tag)| Dependency {
                name: name.to_string(),
                tag: tag.to_string(),
            })
            .collect(),
    }
}

fn revert(instances: Option<&[&str]>) -> RevertRequest {
    RevertRequest {
        component_name: "alpha".to_string(),
        facility: "F1".to_string(),
        instance_names: instances.map(names),
        user: "op".to_string(),
    }
}

async fn seeded() -> MemoryRegistry {
    let registry = MemoryRegistry::new();
    registry
        .insert_history(entry("tagA", 60, &[("i1", "tagA"), ("i2", "tagA")]))
        .await;
    registry
        .insert_history(entry("tagB", 10, &[("i1", "tagB"), ("i2", "tagA")]))
        .await;
    registry
}

#[tokio::test]
async fn test_revert_restores_previous_tag_for_changed_instances() {
    let registry = seeded().await;

    let planned = plan_revert(&registry, &revert(None)).await.unwrap().unwrap();

    assert_eq!(planned.tag, "tagA");
    assert_eq!(planned.instance_names, Some(names(&["i1"])));
    assert_eq!(planned.facilities, Some(names(&["F1"])));
    assert!(!planned.dry_run);
}

#[tokio::test]
async fn test_revert_uses_two_most_recent_entries() {
    let registry = seeded().await;
    registry
        .insert_history(entry("tagC", 1, &[("i1", "tagB"), ("i2", "tagC")]))
        .await;

    let planned = plan_revert(&registry, &revert(None)).await.unwrap().unwrap();

    assert_eq!(planned.tag, "tagB");
    assert_eq!(planned.instance_names, Some(names(&["i2"])));
}

#[tokio::test]
async fn test_revert_filter_leaves_nothing() {
    let registry = seeded().await;

    let planned = plan_revert(&registry, &revert(Some(&["i2"]))).await.unwrap();
    assert!(planned.is_none());
}

#[tokio::test]
async fn test_revert_needs_two_entries() {
    let registry = MemoryRegistry::new();
    registry
        .insert_history(entry("tagA", 5, &[("i1", "tagA")]))
        .await;

    let planned = plan_revert(&registry, &revert(None)).await.unwrap();
    assert!(planned.is_none());
}

#[tokio::test]
async fn test_revert_ignores_other_facilities() {
    let registry = seeded().await;
    let mut elsewhere = entry("tagZ", 0, &[("i1", "tagZ")]);
    elsewhere.facility = "F2".to_string();
    registry.insert_history(elsewhere).await;

    let planned = plan_revert(&registry, &revert(None)).await.unwrap().unwrap();
    assert_eq!(planned.tag, "tagA");
}
