//! Mock gate for testing code written against the gate traits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use migration_gate_core::error::GateResult;
use migration_gate_core::status::{CompletionToken, GateStatus, WaitOutcome};
use migration_gate_core::traits::{ExclusiveGate, GateHandle};
use tokio::sync::watch;

/// Mock guard: flips the shared holder back to `None` on drop.
pub struct MockGuard {
    holder: Arc<Mutex<Option<String>>>,
    token: CompletionToken,
}

impl GateHandle for MockGuard {
    fn epoch(&self) -> u64 {
        1
    }

    fn completion_token(&self) -> &CompletionToken {
        &self.token
    }

    fn release(self) {}
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        *self.holder.lock().unwrap() = None;
    }
}

/// Mock gate that records acquisitions and can be pinned as "held by someone else".
#[derive(Clone, Default)]
pub struct MockGate {
    holder: Arc<Mutex<Option<String>>>,
    pub acquisitions: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gate that is already held by `operation_id`.
    pub fn held_by(operation_id: &str) -> Self {
        let gate = Self::new();
        *gate.holder.lock().unwrap() = Some(operation_id.to_string());
        gate
    }
}

impl ExclusiveGate for MockGate {
    type Guard = MockGuard;

    fn try_acquire(&self, operation_id: &str, origin_id: &str) -> bool {
        let mut holder = self.holder.lock().unwrap();
        if holder.is_some() {
            return false;
        }
        *holder = Some(operation_id.to_string());
        self.acquisitions
            .lock()
            .unwrap()
            .push((operation_id.to_string(), origin_id.to_string()));
        true
    }

    fn try_acquire_guard(&self, operation_id: &str, origin_id: &str) -> Option<MockGuard> {
        if !self.try_acquire(operation_id, origin_id) {
            return None;
        }
        let (_sender, token) = watch::channel(None);
        Some(MockGuard {
            holder: self.holder.clone(),
            token,
        })
    }

    fn release(&self) {
        *self.holder.lock().unwrap() = None;
    }

    fn force_complete(&self, _reason: &str) {
        self.release();
    }

    async fn wait_for_completion(
        &self,
        _cancel: Option<watch::Receiver<bool>>,
    ) -> GateResult<WaitOutcome> {
        Ok(WaitOutcome::Idle)
    }

    fn status(&self) -> GateStatus {
        match self.holder.lock().unwrap().as_ref() {
            Some(operation_id) => GateStatus {
                held: true,
                operation_id: operation_id.clone(),
                origin_id: "mock".to_string(),
                elapsed: Duration::ZERO,
                epoch: 1,
            },
            None => GateStatus::idle(0),
        }
    }
}
