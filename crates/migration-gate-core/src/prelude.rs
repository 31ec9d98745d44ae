//! Convenience prelude for gate types.

pub use crate::error::{GateError, GateResult};
pub use crate::status::{CompletionToken, GateStatus, WaitOutcome};
pub use crate::timeout::WaitTimeout;
pub use crate::traits::{ExclusiveGate, ExclusiveGateExt, GateHandle};
