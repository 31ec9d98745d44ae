//! Per-acquisition completion signal.

use migration_gate_core::status::{CompletionToken, WaitOutcome};
use tokio::sync::watch;

/// One-shot broadcast fired when a holding period ends.
///
/// A new signal is created for every acquisition, so a receiver can only be
/// woken by the end of the holding period it subscribed to. Firing consumes
/// the signal, which makes a second fire impossible.
pub(crate) struct CompletionSignal {
    sender: watch::Sender<Option<WaitOutcome>>,
}

impl CompletionSignal {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> CompletionToken {
        self.sender.subscribe()
    }

    /// Wakes every subscriber with `outcome`.
    pub(crate) fn fire(self, outcome: WaitOutcome) {
        // send_replace stores the value even with no receivers left
        self.sender.send_replace(Some(outcome));
    }
}

/// Resolves once the signal behind `token` fires.
///
/// A signal dropped without firing (the gate itself went away) resolves as
/// `Completed`: there is no holding period left to wait for.
pub(crate) async fn fired(mut token: CompletionToken) -> WaitOutcome {
    let seen = token.wait_for(Option::is_some).await.map(|value| *value);
    match seen {
        Ok(Some(outcome)) => outcome,
        Ok(None) | Err(_) => WaitOutcome::Completed,
    }
}
