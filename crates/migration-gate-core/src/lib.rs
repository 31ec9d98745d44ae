//! Core traits and types for the single-slot migration gate.

pub mod error;
pub mod prelude;
pub mod status;
pub mod timeout;
pub mod traits;

pub use error::{GateError, GateResult};
pub use prelude::*;
