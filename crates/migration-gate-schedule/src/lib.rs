//! Scheduled migration runner and settings for the migration gate.
//!
//! - [`ScheduledTaskSettings`]: when the scheduled migration fires
//! - [`AppSettingsFile`]: reads and patches sections of the JSON settings file
//! - [`ScheduledMigrationRunner`]: the periodic caller that competes for the gate

pub mod runner;
pub mod settings;
pub mod settings_file;

pub use runner::{DEFAULT_ORIGIN, JobContext, RunReport, ScheduledMigrationRunner};
pub use settings::{ExecutionMode, ScheduledTaskSettings};
pub use settings_file::AppSettingsFile;
