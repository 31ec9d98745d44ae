//! Demo: one migration holds the gate while request handlers wait for it.
//!
//! Run with: `RUST_LOG=debug cargo run --example gate_waiters`

use std::time::Duration;

use migration_gate::*;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // One gate for the whole process
    let gate = OperationGate::new();

    let guard = gate
        .try_acquire_guard("migration-001", "10.0.0.7")
        .ok_or("gate unexpectedly held")?;
    println!("Started: {}", gate.status());

    // A second request is turned away instead of queued
    if !gate.try_acquire("migration-002", "10.0.0.8") {
        println!("Second migration rejected: {}", gate.status());
    }

    // Request handlers that only want the result wait for completion
    let mut waiters = Vec::new();
    for i in 0..3 {
        let gate = gate.clone();
        waiters.push(tokio::spawn(async move {
            let outcome = gate.wait_for_completion(None).await?;
            println!("Waiter {i} resumed: {outcome}");
            Ok::<_, GateError>(())
        }));
    }

    // This one gives up when its client disconnects
    let (disconnect_tx, disconnect_rx) = watch::channel(false);
    let impatient = {
        let gate = gate.clone();
        tokio::spawn(async move { gate.wait_for_completion(Some(disconnect_rx)).await })
    };
    disconnect_tx.send(true)?;
    println!("Impatient waiter: {:?}", impatient.await?);

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("Still running: {}", gate.status());

    guard.release();
    for waiter in waiters {
        waiter.await??;
    }
    println!("Finished: {}", gate.status());

    Ok(())
}
