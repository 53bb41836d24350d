//! Task engine tests

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;
use uuid::Uuid;

use deployctl::deploy::fsm::TaskStatus;
use deployctl::errors::ControllerError;
use deployctl::models::task::TaskResult;
use deployctl::tasks::{MemoryTaskStore, TaskEngine, TaskStoreExt};

fn engine(ttl: Duration) -> TaskEngine {
    TaskEngine::new(Arc::new(MemoryTaskStore::new()), ttl)
}

fn result() -> TaskResult {
    TaskResult {
        report: "Deployment report".to_string(),
        report_path: PathBuf::from("/tmp/alpha-R1.log"),
        success: true,
    }
}

#[tokio::test]
async fn test_create_is_pending_with_scratch_dir() {
    let tasks = engine(Duration::from_secs(60));

    let task = tasks.create(&PathBuf::from("/scratch")).await.unwrap();
    let stored = tasks.get(&task.task_id).await.unwrap().unwrap();

    assert_eq!(stored.status, TaskStatus::Pending);
    assert_eq!(stored.progress.percent, 0);
    assert_eq!(stored.temp_dir, PathBuf::from("/scratch").join(task.task_id.to_string()));
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let tasks = engine(Duration::from_secs(60));
    let task = tasks.create(&PathBuf::from("/scratch")).await.unwrap();

    tasks
        .update_progress(&task.task_id, "Deploying to F2", 45, None)
        .await
        .unwrap();
    tasks
        .update_progress(&task.task_id, "Retrying", 10, Some("late".to_string()))
        .await
        .unwrap();

    let stored = tasks.get(&task.task_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Running);
    assert_eq!(stored.progress.percent, 45);
    assert_eq!(stored.progress.step, "Retrying");
    assert!(stored.updated_at >= stored.started_at);
}

#[tokio::test]
async fn test_terminal_state_ignores_later_updates() {
    let tasks = engine(Duration::from_secs(60));
    let task = tasks.create(&PathBuf::from("/scratch")).await.unwrap();

    tasks.complete(&task.task_id, result()).await.unwrap();
    tasks
        .update_progress(&task.task_id, "Deploying to F1", 30, None)
        .await
        .unwrap();
    tasks.fail(&task.task_id, "too late").await.unwrap();

    let stored = tasks.get(&task.task_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.progress.percent, 100);
    assert!(stored.error.is_none());
    assert_eq!(stored.result, Some(result()));
}

#[tokio::test]
async fn test_fail_records_error() {
    let tasks = engine(Duration::from_secs(60));
    let task = tasks.create(&PathBuf::from("/scratch")).await.unwrap();

    tasks.fail(&task.task_id, "release not found").await.unwrap();

    let stored = tasks.get(&task.task_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some("release not found"));
    assert!(stored.result.is_none());
}

#[tokio::test]
async fn test_unknown_task() {
    let tasks = engine(Duration::from_secs(60));
    let task_id = Uuid::new_v4();

    assert!(tasks.get(&task_id).await.unwrap().is_none());
    let err = tasks
        .update_progress(&task_id, "Deploying", 50, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::NotFound(_)));
}

#[tokio::test]
async fn test_expired_running_task_is_rewritten() {
    let tasks = engine(Duration::from_millis(30));
    let task = tasks.create(&PathBuf::from("/scratch")).await.unwrap();
    tasks
        .update_progress(&task.task_id, "Fetching release", 10, None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(tasks.get(&task.task_id).await.unwrap().is_none());

    tasks
        .update_progress(&task.task_id, "Deploying to F1", 25, None)
        .await
        .unwrap();
    let stored = tasks.get(&task.task_id).await.unwrap().unwrap();
    assert_eq!(stored.progress.percent, 25);
    assert_eq!(stored.status, TaskStatus::Running);
}

/// Writes block until two of them are in flight at once
struct RendezvousStore {
    inner: MemoryTaskStore,
    armed: AtomicBool,
    barrier: Barrier,
}

#[async_trait]
impl TaskStoreExt for RendezvousStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ControllerError> {
        self.inner.get(key).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), ControllerError> {
        if self.armed.load(Ordering::SeqCst) {
            self.barrier.wait().await;
        }
        self.inner.set_with_ttl(key, value, ttl).await
    }
}

#[tokio::test]
async fn test_updates_to_different_tasks_do_not_serialize() {
    let store = Arc::new(RendezvousStore {
        inner: MemoryTaskStore::new(),
        armed: AtomicBool::new(false),
        barrier: Barrier::new(2),
    });
    let tasks = TaskEngine::new(store.clone(), Duration::from_secs(60));
    let first = tasks.create(&PathBuf::from("/scratch")).await.unwrap();
    let second = tasks.create(&PathBuf::from("/scratch")).await.unwrap();
    store.armed.store(true, Ordering::SeqCst);

    let both = async {
        tokio::join!(
            tasks.update_progress(&first.task_id, "Deploying to F1", 30, None),
            tasks.update_progress(&second.task_id, "Deploying to F2", 40, None),
        )
    };
    let (a, b) = tokio::time::timeout(Duration::from_secs(2), both)
        .await
        .expect("store writes for separate tasks were serialized");
    a.unwrap();
    b.unwrap();

    store.armed.store(false, Ordering::SeqCst);
    assert_eq!(tasks.get(&first.task_id).await.unwrap().unwrap().progress.percent, 30);
    assert_eq!(tasks.get(&second.task_id).await.unwrap().unwrap().progress.percent, 40);
}
