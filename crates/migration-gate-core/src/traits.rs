//! Core traits for the migration gate.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{GateError, GateResult};
use crate::status::{CompletionToken, GateStatus, WaitOutcome};
use crate::timeout::WaitTimeout;

// ============================================================================
// Gate Handle Trait
// ============================================================================

/// Scoped ownership of one holding period of a gate.
///
/// Dropping the handle releases the gate, so the protected work cannot leave
/// it held on an early return or a panic. A handle only ever releases its own
/// holding period: once that period has ended some other way, dropping the
/// handle is a no-op even if the gate has been acquired again since.
///
/// # Example
///
/// ```rust,ignore
/// if let Some(guard) = gate.try_acquire_guard(&run_id, &client_ip) {
///     run_migration().await?;
///     guard.release();
/// }
/// ```
pub trait GateHandle: Send + Sync + Sized {
    /// Acquisition generation this handle owns.
    fn epoch(&self) -> u64;

    /// Returns a receiver that yields `Some(outcome)` when this holding
    /// period ends, whoever ended it.
    ///
    /// ```rust,ignore
    /// tokio::select! {
    ///     _ = token.changed() => eprintln!("gate was force-completed"),
    ///     _ = do_work() => {}
    /// }
    /// ```
    fn completion_token(&self) -> &CompletionToken;

    /// Explicitly releases the gate, waking every waiter with `Completed`.
    ///
    /// This is also called automatically on drop.
    fn release(self);
}

// ============================================================================
// Exclusive Gate Trait
// ============================================================================

/// A single-slot admission gate for a long-running operation.
///
/// At most one holder exists at a time. Callers that want to *start* the
/// operation use [`try_acquire`](Self::try_acquire) (or the scoped
/// [`try_acquire_guard`](Self::try_acquire_guard)); callers that only want to
/// know when the current operation ends use
/// [`wait_for_completion`](Self::wait_for_completion).
///
/// There is no queue: a second acquisition while held fails fast and the
/// caller decides whether to poll, reject or wait.
pub trait ExclusiveGate: Send + Sync {
    /// The scoped handle returned by [`try_acquire_guard`](Self::try_acquire_guard).
    type Guard: GateHandle + Send;

    /// Takes the gate if it is free.
    ///
    /// Returns `false` without changing anything when the gate is already
    /// held. Among any set of simultaneous callers exactly one observes `true`.
    fn try_acquire(&self, operation_id: &str, origin_id: &str) -> bool;

    /// Takes the gate if it is free, returning a handle that releases it on drop.
    fn try_acquire_guard(&self, operation_id: &str, origin_id: &str) -> Option<Self::Guard>;

    /// Ends the current holding period, waking every waiter with `Completed`.
    ///
    /// No-op when the gate is free.
    fn release(&self);

    /// Administrative override: ends the current holding period regardless of
    /// who holds it. Waiters observe `ForceCompleted`. No-op when free.
    fn force_complete(&self, reason: &str);

    /// Waits until the current holding period ends.
    ///
    /// Returns `Ok(WaitOutcome::Idle)` immediately when the gate is free. A
    /// waiter is only ever woken by the end of the holding period that was
    /// current when it started waiting.
    ///
    /// # Cancellation
    ///
    /// The wait fails with [`GateError::Cancelled`] as soon as `cancel`
    /// observes `true`. Cancelling one waiter does not affect the gate or any
    /// other waiter. Dropping the returned future has the same effect.
    fn wait_for_completion(
        &self,
        cancel: Option<watch::Receiver<bool>>,
    ) -> impl Future<Output = GateResult<WaitOutcome>> + Send;

    /// Returns a consistent snapshot of the gate.
    fn status(&self) -> GateStatus;
}

// ============================================================================
// Convenience Extensions
// ============================================================================

/// Extension trait providing convenience methods for gates.
pub trait ExclusiveGateExt: ExclusiveGate {
    /// Waits for completion for at most `timeout` (`None` waits forever).
    ///
    /// An expired wait is unregistered exactly like a cancelled one.
    fn wait_for_completion_timeout(
        &self,
        timeout: WaitTimeout,
    ) -> impl Future<Output = GateResult<WaitOutcome>> + Send {
        async move {
            match timeout {
                None => self.wait_for_completion(None).await,
                Some(limit) => tokio::time::timeout(limit, self.wait_for_completion(None))
                    .await
                    .unwrap_or(Err(GateError::Timeout(limit))),
            }
        }
    }

    /// Runs `work` while holding the gate.
    ///
    /// Returns `Ok(None)` without running anything when the gate is held by
    /// someone else. The gate is released whether `work` succeeds, fails,
    /// panics or is dropped; a failure is returned as [`GateError::Job`].
    fn run_exclusive<F, Fut, T, E>(
        &self,
        operation_id: &str,
        origin_id: &str,
        work: F,
    ) -> impl Future<Output = GateResult<Option<T>>> + Send
    where
        F: FnOnce(CompletionToken) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        async move {
            let Some(guard) = self.try_acquire_guard(operation_id, origin_id) else {
                return Ok(None);
            };
            let result = work(guard.completion_token().clone()).await;
            guard.release();
            result.map(Some).map_err(|e| GateError::Job(e.into()))
        }
    }
}

// Blanket implementation for all gates
impl<T: ExclusiveGate> ExclusiveGateExt for T {}
