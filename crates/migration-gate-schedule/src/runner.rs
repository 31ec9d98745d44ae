//! Scheduled migration runner.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use migration_gate_core::error::{GateError, GateResult};
use migration_gate_core::status::{CompletionToken, GateStatus};
use migration_gate_core::traits::{ExclusiveGate, GateHandle};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::settings::ScheduledTaskSettings;

/// Origin recorded on the gate for scheduled runs.
pub const DEFAULT_ORIGIN: &str = "scheduler";

/// What a scheduled migration job gets to see about its own run.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Identifier this run holds the gate under.
    pub operation_id: String,
    /// Yields `Some(_)` if the holding period is ended from outside the job,
    /// e.g. by an administrative force-complete.
    pub completion: CompletionToken,
}

/// Result of one scheduled trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// The job ran to completion while holding the gate.
    Completed {
        operation_id: String,
        elapsed: Duration,
    },
    /// The gate was held by someone else, so nothing ran.
    Skipped { holder: GateStatus },
}

/// Periodically attempts the migration through the shared gate.
///
/// The runner is just another gate caller: a trigger that finds the gate held
/// is skipped, not queued.
pub struct ScheduledMigrationRunner<G> {
    gate: G,
    settings: ScheduledTaskSettings,
    origin: String,
}

impl<G: ExclusiveGate> ScheduledMigrationRunner<G> {
    /// Creates a runner using the shared `gate`.
    pub fn new(gate: G, settings: ScheduledTaskSettings) -> Self {
        Self {
            gate,
            settings,
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }

    /// Sets the origin recorded on the gate while a scheduled run holds it.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn settings(&self) -> &ScheduledTaskSettings {
        &self.settings
    }

    /// Attempts one run of `job` right now.
    ///
    /// The gate is released whether the job succeeds, fails or panics. A job
    /// failure is returned as [`GateError::Job`].
    #[instrument(skip(self, job), fields(origin = %self.origin))]
    pub async fn run_once<F, Fut, E>(&self, job: &F) -> GateResult<RunReport>
    where
        F: Fn(JobContext) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let operation_id = Uuid::new_v4().to_string();
        let Some(guard) = self.gate.try_acquire_guard(&operation_id, &self.origin) else {
            let holder = self.gate.status();
            info!(holder = %holder, "scheduled migration skipped: gate is held");
            return Ok(RunReport::Skipped { holder });
        };

        info!(operation_id = %operation_id, epoch = guard.epoch(), "scheduled migration started");
        let started = Instant::now();
        let context = JobContext {
            operation_id: operation_id.clone(),
            completion: guard.completion_token().clone(),
        };
        let result = job(context).await;
        guard.release();
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                info!(
                    operation_id = %operation_id,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "scheduled migration finished"
                );
                Ok(RunReport::Completed {
                    operation_id,
                    elapsed,
                })
            }
            Err(e) => {
                let e = e.into();
                warn!(operation_id = %operation_id, error = %e, "scheduled migration failed");
                Err(GateError::Job(e))
            }
        }
    }

    /// Runs `job` on the configured schedule until `shutdown` observes `true`
    /// (or its sender is dropped).
    ///
    /// Returns immediately when the schedule is disabled. A run already in
    /// progress when shutdown is requested is allowed to finish. Failed runs
    /// are logged and the loop waits for the next trigger.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidSettings`] if the schedule cannot be executed.
    pub async fn run<F, Fut, E>(&self, job: F, mut shutdown: watch::Receiver<bool>) -> GateResult<()>
    where
        F: Fn(JobContext) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if !self.settings.is_enabled {
            info!("scheduled migration disabled");
            return Ok(());
        }
        self.settings.validate()?;
        info!(mode = %self.settings.execution_mode, "scheduled migration runner started");

        loop {
            let now = Local::now();
            let next = self.settings.next_run_after(&now)?;
            let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(
                next_run = %next,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "waiting for next trigger"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_requested(&mut shutdown) => {
                    info!("scheduled migration runner stopped");
                    return Ok(());
                }
            }

            if let Err(e) = self.run_once(&job).await {
                warn!(error = %e, "scheduled run failed; waiting for next trigger");
            }
        }
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as shutdown
    let _ = shutdown.wait_for(|stop| *stop).await;
}
