//! In-process single-slot operation gate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use migration_gate_core::error::{GateError, GateResult};
use migration_gate_core::status::{GateStatus, WaitOutcome};
use migration_gate_core::traits::ExclusiveGate;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Span, debug, instrument, warn};

use crate::guard::GateGuard;
use crate::signal::{CompletionSignal, fired};

/// Process-wide gate that admits at most one migration at a time.
///
/// Cloning is cheap and every clone refers to the same gate: construct one at
/// startup and hand a clone to each request handler and scheduled runner.
///
/// # Example
///
/// ```rust,ignore
/// let gate = OperationGate::new();
///
/// if gate.try_acquire("run-42", "10.0.0.7") {
///     // ... migrate ...
///     gate.release();
/// }
///
/// // Elsewhere: block until the running migration (if any) ends.
/// gate.wait_for_completion(None).await?;
/// ```
#[derive(Clone, Default)]
pub struct OperationGate {
    state: Arc<Mutex<GateState>>,
}

#[derive(Default)]
struct GateState {
    /// `Some` exactly while the gate is held.
    holder: Option<Holder>,
    /// Generation of the latest acquisition.
    epoch: u64,
}

struct Holder {
    operation_id: String,
    origin_id: String,
    started_at: Instant,
    epoch: u64,
    signal: CompletionSignal,
}

impl OperationGate {
    /// Creates a free gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every critical section below is panic-free, so a poisoned lock still
    /// guards a consistent state.
    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the gate if free and runs `on_acquired` on the new holder inside
    /// the same critical section.
    #[instrument(skip(self, on_acquired), fields(acquired = tracing::field::Empty, epoch = tracing::field::Empty))]
    fn acquire<R>(
        &self,
        operation_id: &str,
        origin_id: &str,
        on_acquired: impl FnOnce(&Holder) -> R,
    ) -> Option<R> {
        let mut state = self.state();
        if state.holder.is_some() {
            Span::current().record("acquired", false);
            debug!("gate acquisition denied: already held");
            return None;
        }

        state.epoch += 1;
        let epoch = state.epoch;
        let holder = state.holder.insert(Holder {
            operation_id: operation_id.to_string(),
            origin_id: origin_id.to_string(),
            started_at: Instant::now(),
            epoch,
            signal: CompletionSignal::new(),
        });
        Span::current().record("acquired", true);
        Span::current().record("epoch", epoch);
        debug!("gate acquired");
        Some(on_acquired(holder))
    }

    /// Ends the holding period `epoch` if it is still current.
    ///
    /// Returns false when that period already ended.
    pub(crate) fn release_epoch(&self, epoch: u64, outcome: WaitOutcome) -> bool {
        let mut state = self.state();
        let current = state
            .holder
            .as_ref()
            .is_some_and(|holder| holder.epoch == epoch);
        if current {
            Self::end_holding(&mut state, outcome, None);
        }
        current
    }

    /// Clears the holder and fires its signal inside the caller's critical section.
    fn end_holding(state: &mut GateState, outcome: WaitOutcome, reason: Option<&str>) {
        let Some(holder) = state.holder.take() else {
            return;
        };
        let elapsed_ms = u64::try_from(holder.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        match reason {
            Some(reason) => warn!(
                operation_id = %holder.operation_id,
                origin_id = %holder.origin_id,
                epoch = holder.epoch,
                elapsed_ms,
                reason,
                "gate force-completed by administrative override"
            ),
            None => debug!(
                operation_id = %holder.operation_id,
                origin_id = %holder.origin_id,
                epoch = holder.epoch,
                elapsed_ms,
                "gate released"
            ),
        }

        holder.signal.fire(outcome);
    }

    /// Takes the gate if it is free, returning a handle that releases it on drop.
    pub fn try_acquire_guard(&self, operation_id: &str, origin_id: &str) -> Option<GateGuard> {
        let (epoch, token) = self.acquire(operation_id, origin_id, |holder| {
            (holder.epoch, holder.signal.subscribe())
        })?;
        Some(GateGuard::new(self.clone(), epoch, token))
    }

    /// Returns true if an operation currently holds the gate.
    pub fn is_held(&self) -> bool {
        self.state().holder.is_some()
    }
}

impl ExclusiveGate for OperationGate {
    type Guard = GateGuard;

    fn try_acquire(&self, operation_id: &str, origin_id: &str) -> bool {
        self.acquire(operation_id, origin_id, |_| ()).is_some()
    }

    fn try_acquire_guard(&self, operation_id: &str, origin_id: &str) -> Option<GateGuard> {
        OperationGate::try_acquire_guard(self, operation_id, origin_id)
    }

    fn release(&self) {
        let mut state = self.state();
        Self::end_holding(&mut state, WaitOutcome::Completed, None);
    }

    fn force_complete(&self, reason: &str) {
        let mut state = self.state();
        Self::end_holding(&mut state, WaitOutcome::ForceCompleted, Some(reason));
    }

    #[instrument(skip(self, cancel), fields(epoch = tracing::field::Empty, outcome = tracing::field::Empty))]
    async fn wait_for_completion(
        &self,
        cancel: Option<watch::Receiver<bool>>,
    ) -> GateResult<WaitOutcome> {
        let token = {
            let state = self.state();
            match &state.holder {
                Some(holder) => {
                    Span::current().record("epoch", holder.epoch);
                    holder.signal.subscribe()
                }
                None => {
                    Span::current().record("outcome", "idle");
                    return Ok(WaitOutcome::Idle);
                }
            }
        };

        let outcome = match cancel {
            None => fired(token).await,
            Some(mut cancel) => {
                tokio::select! {
                    biased;
                    outcome = fired(token) => outcome,
                    _ = cancelled(&mut cancel) => {
                        Span::current().record("outcome", "cancelled");
                        debug!("wait for completion cancelled");
                        return Err(GateError::Cancelled);
                    }
                }
            }
        };

        Span::current().record("outcome", tracing::field::display(outcome));
        Ok(outcome)
    }

    fn status(&self) -> GateStatus {
        let state = self.state();
        match &state.holder {
            Some(holder) => GateStatus {
                held: true,
                operation_id: holder.operation_id.clone(),
                origin_id: holder.origin_id.clone(),
                elapsed: holder.started_at.elapsed(),
                epoch: holder.epoch,
            },
            None => GateStatus::idle(state.epoch),
        }
    }
}

/// Resolves once `cancel` observes `true`; never resolves if its sender is
/// dropped without signalling.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
