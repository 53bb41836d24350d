//! Deployer pool and sweeper tests

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use uuid::Uuid;

use deployctl::deploy::executor::DeploymentJob;
use deployctl::deploy::fsm::TaskStatus;
use deployctl::filesys::dir::Dir;
use deployctl::models::plan::DeploymentPlan;
use deployctl::models::request::DeploymentKind;
use deployctl::models::task::DeploymentTask;
use deployctl::tasks::{MemoryTaskStore, TaskEngine};
use deployctl::workers::deployer::{self, DeployerPool};
use deployctl::workers::sweeper::{self, sweep_scratch};

use crate::support::{FakeLogbook, FakeProvisioner, Harness};

fn display_job(task: &DeploymentTask, facilities: &[&str]) -> DeploymentJob {
    let mut plan = DeploymentPlan::default();
    for facility in facilities {
        plan.facility_instances
            .insert(facility.to_string(), Default::default());
    }
    DeploymentJob {
        task_id: task.task_id,
        kind: DeploymentKind::Display,
        component_name: "screens".to_string(),
        tag: "D1".to_string(),
        user: "op".to_string(),
        dry_run: true,
        component_type: "display".to_string(),
        plan,
        scratch_dir: task.temp_dir.clone(),
    }
}

async fn wait_terminal(tasks: &TaskEngine, task_id: &Uuid) -> DeploymentTask {
    for _ in 0..200 {
        if let Some(task) = tasks.get(task_id).await.unwrap() {
            if task.status.is_terminal() {
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} did not finish", task_id);
}

fn options(workers: usize) -> deployer::Options {
    deployer::Options {
        workers,
        cleanup_delay: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn test_pool_runs_jobs_and_cleans_scratch() {
    let harness = Harness::new();
    let (pool, queue) = DeployerPool::new();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let executor = harness.executor.clone();
    let runner = tokio::spawn(async move {
        deployer::run(
            &options(2),
            executor,
            queue,
            Box::pin(async move {
                let _ = stop_rx.await;
            }),
        )
        .await;
    });

    let task = harness.tasks.create(&harness.scratch_root()).await.unwrap();
    Dir::new(&task.temp_dir).create().await.unwrap();
    pool.submit(display_job(&task, &["F1", "F2"])).unwrap();

    let finished = wait_terminal(&harness.tasks, &task.task_id).await;
    assert_eq!(finished.status, TaskStatus::Completed);
    assert_eq!(harness.provisioner.invocations().len(), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!task.temp_dir.exists());

    let _ = stop_tx.send(());
    runner.await.unwrap();
}

#[tokio::test]
async fn test_jobs_run_concurrently() {
    let harness = Harness::with(
        FakeProvisioner::slow(Duration::from_millis(150)),
        FakeLogbook::new(),
        Duration::from_secs(300),
    );
    let (pool, queue) = DeployerPool::new();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let executor = harness.executor.clone();
    let runner = tokio::spawn(async move {
        deployer::run(
            &options(4),
            executor,
            queue,
            Box::pin(async move {
                let _ = stop_rx.await;
            }),
        )
        .await;
    });

    let mut ids = Vec::new();
    for _ in 0..3 {
        let task = harness.tasks.create(&harness.scratch_root()).await.unwrap();
        pool.submit(display_job(&task, &["F1"])).unwrap();
        ids.push(task.task_id);
    }

    tokio::time::sleep(Duration::from_millis(60)).await;
    let mut running = 0;
    for id in &ids {
        if harness.tasks.get(id).await.unwrap().unwrap().status == TaskStatus::Running {
            running += 1;
        }
    }
    assert_eq!(running, 3);

    for id in &ids {
        assert_eq!(wait_terminal(&harness.tasks, id).await.status, TaskStatus::Completed);
    }

    let _ = stop_tx.send(());
    runner.await.unwrap();
}

#[tokio::test]
async fn test_panicking_job_fails_only_its_task() {
    let harness = Harness::with(
        FakeProvisioner::panicking(),
        FakeLogbook::new(),
        Duration::from_secs(300),
    );
    let task = harness.tasks.create(&harness.scratch_root()).await.unwrap();

    deployer::execute_job(&harness.executor, display_job(&task, &["F1"]), Duration::from_secs(60))
        .await;

    let stored = harness.tasks.get(&task.task_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    let error = stored.error.unwrap();
    assert!(error.starts_with("Infrastructure error"));
    assert!(error.contains("provisioner exploded"));
}

#[tokio::test]
async fn test_submit_after_shutdown_is_rejected() {
    let (pool, queue) = DeployerPool::new();
    drop(queue);

    let task = DeploymentTask::new(Uuid::new_v4(), PathBuf::from("/scratch/x"));
    assert!(pool.submit(display_job(&task, &["F1"])).is_err());
}

#[tokio::test]
async fn test_sweep_removes_only_old_directories() {
    let root = tempfile::tempdir().unwrap();
    let scratch = Dir::new(root.path());
    scratch.subdir("old").create().await.unwrap();
    scratch.subdir("fresh").create().await.unwrap();

    assert_eq!(sweep_scratch(&scratch, Duration::from_secs(3600)).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(30)).await;
    scratch.subdir("fresh").file("touch").write_string("x").await.unwrap();

    let removed = sweep_scratch(&scratch, Duration::from_millis(20)).await.unwrap();
    assert_eq!(removed, 1);
    assert!(!scratch.subdir("old").exists().await);
    assert!(scratch.subdir("fresh").exists().await);
}

#[tokio::test]
async fn test_sweeper_purges_expired_records() {
    let root = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryTaskStore::new());
    let tasks = TaskEngine::new(store.clone(), Duration::from_millis(5));
    let task = tasks.create(root.path()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let scratch = Dir::new(root.path());
    let options = sweeper::Options {
        interval: Duration::from_millis(10),
        max_age: Duration::from_secs(3600),
    };
    let sweeper_store = store.clone();
    let handle = tokio::spawn(async move {
        sweeper::run(
            &options,
            &scratch,
            Some(sweeper_store),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = stop_rx.await;
            }),
        )
        .await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let _ = stop_tx.send(());
    handle.await.unwrap();

    assert_eq!(store.purge_expired().await, 0);
    assert!(tasks.get(&task.task_id).await.unwrap().is_none());
}
