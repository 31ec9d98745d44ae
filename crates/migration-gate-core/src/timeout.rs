//! Timeout value helpers.

use std::time::Duration;

/// Represents a timeout duration for waits.
///
/// - `Some(duration)` - Wait up to this duration
/// - `None` - Wait indefinitely
pub type WaitTimeout = Option<Duration>;
