//! Single-slot migration gate with async wait-for-completion.
//!
//! The gate admits at most one long-running "migration" per process. Callers
//! that start the migration take the gate with `try_acquire` (failing fast
//! while another run is in flight); callers that only need to know when the
//! running migration ends await `wait_for_completion`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use migration_gate::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One gate per process, cloned into every caller
//!     let gate = OperationGate::new();
//!
//!     let outcome = gate
//!         .run_exclusive("run-42", "10.0.0.7", |_completion| async {
//!             // Migrate while holding the gate
//!             Ok::<_, std::io::Error>(())
//!         })
//!         .await?;
//!     assert!(outcome.is_some());
//!
//!     // Elsewhere: wait for the running migration, if any
//!     gate.wait_for_completion(None).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `migration-gate-core`: gate traits, status and error types
//! - `migration-gate-process`: the in-process `OperationGate`
//! - `migration-gate-schedule`: scheduled runner and settings file handling
//!
//! For fine-grained control, you can depend on individual crates instead.

// Re-export core types and traits
pub use migration_gate_core::*;

// Re-export the in-process gate
pub use migration_gate_process::*;

// Re-export scheduling
pub use migration_gate_schedule::*;
