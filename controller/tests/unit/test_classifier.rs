//! Classifier tests

use std::collections::BTreeSet;

use deployctl::deploy::classifier::classify;
use deployctl::errors::ControllerError;
use deployctl::models::request::{
    ComponentRequest, DeploymentRequest, InstanceRequest, RevertRequest,
};
use deployctl::registry::MemoryRegistry;

use crate::support::{facilities, names, record};

fn component_request(facilities: &[&str]) -> DeploymentRequest {
    DeploymentRequest::Component(ComponentRequest {
        component_name: "alpha".to_string(),
        facilities: names(facilities),
        tag: "R2".to_string(),
        user: "op".to_string(),
        dry_run: false,
        component_type: "ioc".to_string(),
    })
}

fn instance_request(instances: &[&str], facilities: Option<&[&str]>) -> DeploymentRequest {
    DeploymentRequest::Instance(InstanceRequest {
        component_name: "alpha".to_string(),
        facilities: facilities.map(names),
        tag: "R2".to_string(),
        instance_names: Some(names(instances)),
        user: "op".to_string(),
        dry_run: false,
        component_type: "ioc".to_string(),
    })
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_component_only_new_everywhere() {
    let registry = MemoryRegistry::new();

    let plan = classify(&registry, &component_request(&["F1"]), &facilities())
        .await
        .unwrap();

    assert_eq!(plan.facilities().collect::<Vec<_>>(), vec!["F1"]);
    assert!(plan.instances("F1").unwrap().is_empty());
    assert!(plan.is_new_in("F1"));
    assert!(plan.is_new_component());
}

#[tokio::test]
async fn test_newness_is_per_facility() {
    let registry = MemoryRegistry::new();
    registry.insert_component(record("alpha", "F1", "R1", &[])).await;

    let plan = classify(&registry, &component_request(&["F1", "F2"]), &facilities())
        .await
        .unwrap();

    assert!(!plan.is_new_in("F1"));
    assert!(plan.is_new_in("F2"));
}

#[tokio::test]
async fn test_explicit_facilities_get_every_instance() {
    let registry = MemoryRegistry::new();

    let request = instance_request(&["dev1", "dev2"], Some(&["F1", "F3"]));
    let plan = classify(&registry, &request, &facilities()).await.unwrap();

    assert_eq!(plan.instances("F1"), Some(&set(&["dev1", "dev2"])));
    assert_eq!(plan.instances("F3"), Some(&set(&["dev1", "dev2"])));
    assert!(plan.instances("F2").is_none());
}

#[tokio::test]
async fn test_instances_located_through_registry() {
    let registry = MemoryRegistry::new();
    registry
        .insert_component(record("alpha", "F1", "R1", &["dev0"]))
        .await;
    registry
        .insert_component(record("alpha", "F2", "R1", &["dev1", "dev2"]))
        .await;

    let plan = classify(&registry, &instance_request(&["dev1"], None), &facilities())
        .await
        .unwrap();

    assert_eq!(plan.facilities().collect::<Vec<_>>(), vec!["F2"]);
    assert_eq!(plan.instances("F2"), Some(&set(&["dev1"])));
    assert!(!plan.is_new_component());
}

#[tokio::test]
async fn test_instance_in_several_facilities() {
    let registry = MemoryRegistry::new();
    registry
        .insert_component(record("alpha", "F1", "R1", &["dev1"]))
        .await;
    registry
        .insert_component(record("alpha", "F3", "R1", &["dev1", "dev3"]))
        .await;

    let request = instance_request(&["dev1", "dev3"], None);
    let plan = classify(&registry, &request, &facilities()).await.unwrap();

    assert_eq!(plan.instances("F1"), Some(&set(&["dev1"])));
    assert_eq!(plan.instances("F3"), Some(&set(&["dev1", "dev3"])));
    assert_eq!(plan.all_instances(), set(&["dev1", "dev3"]));
}

#[tokio::test]
async fn test_unknown_instance_fails_whole_request() {
    let registry = MemoryRegistry::new();
    registry
        .insert_component(record("alpha", "F2", "R1", &["dev1"]))
        .await;

    let request = instance_request(&["dev1", "dev9"], None);
    let err = classify(&registry, &request, &facilities()).await.unwrap_err();

    match err {
        ControllerError::ClassificationError(message) => assert!(message.contains("dev9")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_facility_rejected() {
    let registry = MemoryRegistry::new();

    let err = classify(&registry, &component_request(&["F9"]), &facilities())
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::ClassificationError(_)));
}

#[tokio::test]
async fn test_revert_must_be_planned_first() {
    let registry = MemoryRegistry::new();
    let request = DeploymentRequest::Revert(RevertRequest {
        component_name: "alpha".to_string(),
        facility: "F1".to_string(),
        instance_names: None,
        user: "op".to_string(),
    });

    assert!(classify(&registry, &request, &facilities()).await.is_err());
}
