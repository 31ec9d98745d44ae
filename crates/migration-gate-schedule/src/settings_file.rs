//! JSON settings file section reader and patcher.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use migration_gate_core::error::{GateError, GateResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use fd_lock::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::settings::ScheduledTaskSettings;

/// A JSON settings file made of named top-level sections.
///
/// Updating a section rewrites the whole file but leaves every other section
/// untouched and in its original order. Updates are serialized through an
/// advisory lock on a sibling `<file>.lock`, across threads and processes.
#[derive(Debug, Clone)]
pub struct AppSettingsFile {
    path: PathBuf,
}

impl AppSettingsFile {
    /// Creates a handle for the settings file at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and deserializes one top-level section.
    ///
    /// Returns `Ok(None)` if the section does not exist.
    #[instrument(skip(self), fields(settings.path = %self.path.display()))]
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> GateResult<Option<T>> {
        let mut root = self.read_root()?;
        let Some(value) = root.remove(name) else {
            debug!("settings section not present");
            return Ok(None);
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| self.error(std::io::ErrorKind::InvalidData, &format!("invalid section '{name}'"), e))
    }

    /// Replaces one top-level section with `value`.
    ///
    /// A section that does not exist yet is appended at the end.
    #[instrument(skip(self, value), fields(settings.path = %self.path.display()))]
    pub fn update_section<T: Serialize>(&self, name: &str, value: &T) -> GateResult<()> {
        let mut lock = RwLock::new(self.open_lock_file()?);
        let _held = lock
            .write()
            .map_err(|e| self.error(e.kind(), "failed to lock settings file", e))?;

        let mut root = self.read_root()?;
        let value = serde_json::to_value(value).map_err(|e| {
            self.error(std::io::ErrorKind::InvalidInput, &format!("cannot serialize section '{name}'"), e)
        })?;

        // Existing keys keep their position
        root.insert(name.to_string(), value);

        let rendered = serde_json::to_string_pretty(&Value::Object(root))
            .map_err(|e| self.error(std::io::ErrorKind::InvalidData, "cannot render settings", e))?;
        self.write_atomically(&rendered)?;
        debug!("settings section updated");
        Ok(())
    }

    /// Reads the `ScheduledTask` section, falling back to defaults when absent.
    pub fn scheduled_task_settings(&self) -> GateResult<ScheduledTaskSettings> {
        Ok(self
            .section(ScheduledTaskSettings::SECTION)?
            .unwrap_or_default())
    }

    /// Writes the `ScheduledTask` section.
    pub fn save_scheduled_task_settings(&self, settings: &ScheduledTaskSettings) -> GateResult<()> {
        self.update_section(ScheduledTaskSettings::SECTION, settings)
    }

    fn read_root(&self) -> GateResult<Map<String, Value>> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| self.error(e.kind(), "failed to read settings file", e))?;
        match serde_json::from_str(&text) {
            Ok(Value::Object(root)) => Ok(root),
            Ok(_) => Err(self.error(
                std::io::ErrorKind::InvalidData,
                "settings file root is not a JSON object",
                "expected '{'",
            )),
            Err(e) => Err(self.error(std::io::ErrorKind::InvalidData, "failed to parse settings file", e)),
        }
    }

    /// The lock file is never removed, so every writer locks the same inode.
    fn open_lock_file(&self) -> GateResult<std::fs::File> {
        let mut lock_path = self.path.clone().into_os_string();
        lock_path.push(".lock");
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(PathBuf::from(lock_path))
            .map_err(|e| self.error(e.kind(), "failed to open settings lock file", e))
    }

    /// Writes a synced temp file next to the target and renames it over the
    /// target, so readers never see a half-written file.
    fn write_atomically(&self, contents: &str) -> GateResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_error = |e: std::io::Error| self.error(e.kind(), "failed to write settings file", e);

        let mut staging = tempfile::Builder::new()
            .prefix(".appsettings.")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(write_error)?;
        staging.as_file_mut().write_all(contents.as_bytes()).map_err(write_error)?;
        staging.as_file().sync_all().map_err(write_error)?;

        // Dropping a `NamedTempFile` on any error path above removes it
        staging
            .persist(&self.path)
            .map(drop)
            .map_err(|e| self.error(e.error.kind(), "failed to replace settings file", e.error))
    }

    fn error(&self, kind: std::io::ErrorKind, what: &str, cause: impl std::fmt::Display) -> GateError {
        GateError::Config(Box::new(std::io::Error::new(
            kind,
            format!("{what} '{}': {cause}", self.path.display()),
        )))
    }
}
