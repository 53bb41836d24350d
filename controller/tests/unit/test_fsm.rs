//! Task state machine tests

use deployctl::deploy::fsm::{TaskEvent, TaskStatus};

#[test]
fn test_fsm_pending_can_finish_directly() {
    assert_eq!(
        TaskStatus::Pending.process(&TaskEvent::Complete).unwrap(),
        TaskStatus::Completed
    );
    assert_eq!(
        TaskStatus::Pending
            .process(&TaskEvent::Fail("boom".to_string()))
            .unwrap(),
        TaskStatus::Failed
    );
}

#[test]
fn test_fsm_running_fails() {
    let status = TaskStatus::Pending.process(&TaskEvent::Progress).unwrap();
    let status = status
        .process(&TaskEvent::Fail("provisioning tool missing".to_string()))
        .unwrap();
    assert_eq!(status, TaskStatus::Failed);
    assert!(status.is_terminal());
}

#[test]
fn test_fsm_only_finished_states_are_terminal() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
}

#[test]
fn test_fsm_invalid_transition() {
    let result = TaskStatus::Completed.process(&TaskEvent::Progress);
    assert!(result.is_err());
}

#[test]
fn test_fsm_wire_names() {
    assert_eq!(TaskStatus::Pending.as_str(), "pending");
    assert_eq!(TaskStatus::Running.to_string(), "running");
    assert_eq!(
        serde_json::to_value(TaskStatus::Completed).unwrap(),
        serde_json::json!("completed")
    );
    assert_eq!(
        serde_json::from_str::<TaskStatus>("\"failed\"").unwrap(),
        TaskStatus::Failed
    );
}
