//! Scoped gate ownership.

use migration_gate_core::status::{CompletionToken, WaitOutcome};
use migration_gate_core::traits::GateHandle;
use tracing::warn;

use crate::gate::OperationGate;

/// Handle for one holding period of an [`OperationGate`].
///
/// Dropping this handle releases the gate, so an early return or a panic in
/// the protected work cannot leave the gate held. If the holding period was
/// already ended by [`force_complete`](migration_gate_core::ExclusiveGate::force_complete),
/// dropping the handle leaves whoever holds the gate now alone.
pub struct GateGuard {
    gate: OperationGate,
    epoch: u64,
    token: CompletionToken,
}

impl GateGuard {
    pub(crate) fn new(gate: OperationGate, epoch: u64, token: CompletionToken) -> Self {
        Self { gate, epoch, token }
    }

    /// Returns true once this holding period has ended, by release or override.
    pub fn is_finished(&self) -> bool {
        self.token.borrow().is_some()
    }
}

impl GateHandle for GateGuard {
    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn completion_token(&self) -> &CompletionToken {
        &self.token
    }

    fn release(self) {
        // Drop does the work
        drop(self);
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        let released = self.gate.release_epoch(self.epoch, WaitOutcome::Completed);
        if released && std::thread::panicking() {
            warn!(epoch = self.epoch, "gate released while unwinding from a panic");
        }
    }
}
