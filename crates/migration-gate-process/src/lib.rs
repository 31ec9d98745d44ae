//! In-process backend for the migration gate.
//!
//! [`OperationGate`] is the single shared admission point for the migration:
//! one instance per process, cloned into every caller.

pub mod gate;
pub mod guard;
mod signal;

pub use gate::OperationGate;
pub use guard::GateGuard;
