//! Demo: scheduled migration runner driven by a JSON settings file.
//!
//! Run with: `cargo run --example scheduled_runner -- path/to/appsettings.json`
//! Stop with Ctrl-C.

use std::time::Duration;

use migration_gate::*;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "appsettings.json".to_string());
    let settings = AppSettingsFile::new(path).scheduled_task_settings()?;
    println!("Schedule: {settings:?}");

    let gate = OperationGate::new();
    let runner = ScheduledMigrationRunner::new(gate.clone(), settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    runner
        .run(
            |ctx: JobContext| async move {
                println!("Migrating as {}", ctx.operation_id);
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok::<_, std::io::Error>(())
            },
            shutdown_rx,
        )
        .await?;

    Ok(())
}
