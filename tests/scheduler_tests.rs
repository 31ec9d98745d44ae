//! Integration tests for the scheduled migration runner.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use migration_gate_core::error::GateError;
use migration_gate_core::status::WaitOutcome;
use migration_gate_core::traits::ExclusiveGate;
use migration_gate_process::OperationGate;
use migration_gate_schedule::{
    AppSettingsFile, ExecutionMode, JobContext, RunReport, ScheduledMigrationRunner,
    ScheduledTaskSettings,
};
use tokio::sync::watch;
use tokio::time::timeout;

mod common;
use common::mock_gate::MockGate;

fn every_minute() -> ScheduledTaskSettings {
    ScheduledTaskSettings {
        execution_mode: ExecutionMode::Interval,
        interval_minutes: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_runner_skips_when_mock_gate_is_held() {
    let runner = ScheduledMigrationRunner::new(MockGate::held_by("manual"), every_minute());
    let ran = AtomicUsize::new(0);

    let report = runner
        .run_once(&|_ctx: JobContext| {
            ran.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, std::io::Error>(()) }
        })
        .await
        .unwrap();

    assert!(matches!(report, RunReport::Skipped { ref holder } if holder.operation_id == "manual"));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(runner.gate().acquisitions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_runner_records_origin_on_mock_gate() {
    let runner = ScheduledMigrationRunner::new(MockGate::new(), every_minute()).with_origin("cron-host");

    let report = runner
        .run_once(&|_ctx: JobContext| async { Ok::<_, std::io::Error>(()) })
        .await
        .unwrap();

    let RunReport::Completed { operation_id, .. } = report else {
        panic!("expected a completed run");
    };
    let acquisitions = runner.gate().acquisitions.lock().unwrap();
    assert_eq!(acquisitions.as_slice(), [(operation_id, "cron-host".to_string())]);
    assert!(!runner.gate().status().held);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_triggers_until_shutdown() {
    let gate = OperationGate::new();
    let runner = ScheduledMigrationRunner::new(gate.clone(), every_minute());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runs = Arc::new(AtomicUsize::new(0));

    let job = {
        let runs = runs.clone();
        let shutdown_tx = Arc::new(shutdown_tx);
        move |_ctx: JobContext| {
            let runs = runs.clone();
            let shutdown_tx = shutdown_tx.clone();
            async move {
                if runs.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    shutdown_tx.send_replace(true);
                }
                Ok::<_, std::io::Error>(())
            }
        }
    };

    timeout(Duration::from_secs(600), runner.run(job, shutdown_rx))
        .await
        .expect("runner did not stop")
        .unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 3);
    assert!(!gate.status().held);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_survives_failing_runs() {
    let runner = ScheduledMigrationRunner::new(OperationGate::new(), every_minute());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let attempts = Arc::new(AtomicUsize::new(0));

    let job = {
        let attempts = attempts.clone();
        move |_ctx: JobContext| {
            let attempts = attempts.clone();
            let shutdown_tx = shutdown_tx.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    shutdown_tx.send_replace(true);
                }
                Err::<(), _>(std::io::Error::other("target database offline"))
            }
        }
    };

    timeout(Duration::from_secs(600), runner.run(job, shutdown_rx))
        .await
        .expect("runner did not stop")
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(!runner.gate().status().held);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_shutdown_sender_stops_runner() {
    let runner = ScheduledMigrationRunner::new(OperationGate::new(), every_minute());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    timeout(
        Duration::from_secs(1),
        runner.run(|_ctx: JobContext| async { Ok::<_, std::io::Error>(()) }, shutdown_rx),
    )
    .await
    .expect("runner did not stop")
    .unwrap();
}

#[tokio::test]
async fn test_cron_schedule_rejected_by_run() {
    let settings = ScheduledTaskSettings {
        execution_mode: ExecutionMode::Cron,
        ..Default::default()
    };
    let runner = ScheduledMigrationRunner::new(OperationGate::new(), settings);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let result = runner
        .run(|_ctx: JobContext| async { Ok::<_, std::io::Error>(()) }, shutdown_rx)
        .await;
    assert!(matches!(result, Err(GateError::InvalidSettings(_))));
}

#[tokio::test]
async fn test_request_waits_for_scheduled_run() {
    let gate = OperationGate::new();
    let runner = ScheduledMigrationRunner::new(gate.clone(), every_minute());
    let (finish_tx, finish_rx) = watch::channel(false);

    let scheduled = tokio::spawn(async move {
        runner
            .run_once(&|_ctx: JobContext| {
                let mut finish_rx = finish_rx.clone();
                async move {
                    let _ = finish_rx.wait_for(|done| *done).await;
                    Ok::<_, std::io::Error>(())
                }
            })
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    let status = gate.status();
    assert!(status.held);
    assert_eq!(status.origin_id, "scheduler");

    // A web request that arrives mid-run is denied and waits instead
    assert!(!gate.try_acquire("request-1", "192.168.1.20"));
    let waiter = {
        let gate = gate.clone();
        tokio::spawn(async move { gate.wait_for_completion(None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    finish_tx.send(true).unwrap();
    let report = scheduled.await.unwrap().unwrap();
    assert!(matches!(report, RunReport::Completed { .. }));

    let outcome = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(outcome.unwrap(), WaitOutcome::Completed);
    assert!(gate.try_acquire("request-1", "192.168.1.20"));
}

#[tokio::test]
async fn test_job_observes_force_complete() {
    let gate = OperationGate::new();
    let runner = ScheduledMigrationRunner::new(gate.clone(), every_minute());
    let admin = gate.clone();

    let report = runner
        .run_once(&|ctx: JobContext| {
            let admin = admin.clone();
            let mut completion = ctx.completion;
            async move {
                admin.force_complete("operator abort");
                completion.changed().await.map_err(std::io::Error::other)?;
                assert_eq!(*completion.borrow(), Some(WaitOutcome::ForceCompleted));
                Ok::<_, std::io::Error>(())
            }
        })
        .await
        .unwrap();

    assert!(matches!(report, RunReport::Completed { .. }));
    assert!(!gate.status().held);
}

#[tokio::test]
async fn test_runner_from_settings_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("appsettings.json");
    std::fs::write(
        &path,
        r#"{
  "ScheduledTask": {
    "ExecutionMode": "Interval",
    "IntervalMinutes": 30,
    "IsEnabled": false
  }
}"#,
    )
    .unwrap();

    let file = AppSettingsFile::new(path.clone());
    let settings = file.scheduled_task_settings().unwrap();
    assert_eq!(settings.execution_mode, ExecutionMode::Interval);
    assert_eq!(settings.interval_minutes, 30);

    let runner = ScheduledMigrationRunner::new(OperationGate::new(), settings.clone());
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    runner
        .run(|_ctx: JobContext| async { Ok::<_, std::io::Error>(()) }, shutdown_rx)
        .await
        .unwrap();

    let enabled = ScheduledTaskSettings {
        is_enabled: true,
        ..settings
    };
    file.save_scheduled_task_settings(&enabled).unwrap();
    assert!(file.scheduled_task_settings().unwrap().is_enabled);
}
