//! Snapshot and outcome types shared by every gate implementation.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

/// How a wait for completion ended successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitOutcome {
    /// The gate was free when the wait began, so there was nothing to wait for.
    Idle,
    /// The holder released the gate.
    Completed,
    /// The holding period was ended through the administrative override.
    ForceCompleted,
}

impl WaitOutcome {
    /// Returns true if the outcome ended a holding period (as opposed to `Idle`).
    pub fn ended_operation(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Completed => "completed",
            Self::ForceCompleted => "force-completed",
        })
    }
}

/// Receiver that yields `Some(outcome)` once the holding period it belongs to ends.
pub type CompletionToken = watch::Receiver<Option<WaitOutcome>>;

/// Point-in-time view of a gate.
///
/// `operation_id` and `origin_id` are empty and `elapsed` is zero whenever
/// `held` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateStatus {
    pub held: bool,
    pub operation_id: String,
    pub origin_id: String,
    pub elapsed: Duration,
    /// Acquisition generation: 0 before the first acquisition, bumped by each one.
    pub epoch: u64,
}

impl GateStatus {
    /// Snapshot of a free gate.
    pub fn idle(epoch: u64) -> Self {
        Self {
            held: false,
            operation_id: String::new(),
            origin_id: String::new(),
            elapsed: Duration::ZERO,
            epoch,
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.held {
            write!(
                f,
                "held by {} from {} for {:.1?} (epoch {})",
                self.operation_id, self.origin_id, self.elapsed, self.epoch
            )
        } else {
            write!(f, "free (epoch {})", self.epoch)
        }
    }
}
