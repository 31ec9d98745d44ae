//! Scheduled migration settings.

use std::fmt;

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone};
use migration_gate_core::error::{GateError, GateResult};
use serde::{Deserialize, Serialize};

/// How the scheduled migration is triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Once a day at [`ScheduledTaskSettings::execution_time`].
    #[default]
    Daily,
    /// Every [`ScheduledTaskSettings::interval_minutes`] minutes.
    Interval,
    /// Cron expression. Recognized in settings files but not executable.
    Cron,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Interval => "interval",
            Self::Cron => "cron",
        })
    }
}

/// The `ScheduledTask` section of the settings file.
///
/// Keys are PascalCase on disk; camelCase keys are accepted on read. Missing
/// keys fall back to the defaults (daily at 18:00, 60 minute interval, enabled).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScheduledTaskSettings {
    #[serde(alias = "executionMode")]
    pub execution_mode: ExecutionMode,

    /// Local wall-clock time for daily runs, `HH:MM:SS`.
    #[serde(alias = "executionTime")]
    pub execution_time: NaiveTime,

    #[serde(alias = "intervalMinutes")]
    pub interval_minutes: u32,

    #[serde(alias = "isEnabled")]
    pub is_enabled: bool,
}

impl ScheduledTaskSettings {
    /// Name of the settings file section holding these settings.
    pub const SECTION: &'static str = "ScheduledTask";

    /// Checks that the settings describe a schedule that can be executed.
    pub fn validate(&self) -> GateResult<()> {
        match self.execution_mode {
            ExecutionMode::Daily => Ok(()),
            ExecutionMode::Interval if self.interval_minutes == 0 => Err(
                GateError::InvalidSettings("interval must be at least one minute".to_string()),
            ),
            ExecutionMode::Interval => Ok(()),
            ExecutionMode::Cron => Err(GateError::InvalidSettings(
                "cron execution mode is not supported".to_string(),
            )),
        }
    }

    /// Computes the first trigger strictly after `now`.
    ///
    /// Daily runs whose local time falls into a daylight-saving gap move to
    /// the next day on which that time exists.
    pub fn next_run_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> GateResult<DateTime<Tz>> {
        self.validate()?;

        match self.execution_mode {
            ExecutionMode::Interval => {
                Ok(now.clone() + TimeDelta::minutes(i64::from(self.interval_minutes)))
            }
            _ => {
                let tz = now.timezone();
                let mut date = now.date_naive();
                for _ in 0..3 {
                    let local = date.and_time(self.execution_time);
                    if let Some(candidate) = tz.from_local_datetime(&local).earliest() {
                        if candidate > *now {
                            return Ok(candidate);
                        }
                    }
                    date = date.succ_opt().ok_or_else(|| {
                        GateError::InvalidSettings("no representable next run date".to_string())
                    })?;
                }
                Err(GateError::InvalidSettings(format!(
                    "execution time {} does not occur in the next days",
                    self.execution_time
                )))
            }
        }
    }
}

impl Default for ScheduledTaskSettings {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Daily,
            execution_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            interval_minutes: 60,
            is_enabled: true,
        }
    }
}
