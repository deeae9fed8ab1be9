//! Durable record of the last announced release.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StateError;

/// What the notifier remembers between runs.
///
/// `last_check` is written as RFC 3339. Older state files may carry a naive
/// ISO-8601 timestamp, which is read as local time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    #[serde(default)]
    pub last_notified_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_check: Option<DateTime<Utc>>,
}

impl NotificationState {
    /// Records a delivered notification for `tag`.
    pub fn record_notified(&mut self, tag: &str, now: DateTime<Utc>) {
        self.last_notified_version = Some(tag.to_string());
        self.last_check = Some(now);
    }

    /// Records a check that sent nothing.
    ///
    /// On a first run the current tag is adopted as already announced, so an
    /// install that was up to date never gets a late notification for it.
    pub fn record_check(&mut self, tag: &str, now: DateTime<Utc>) {
        self.last_check = Some(now);
        if self.last_notified_version.as_deref().is_none_or(str::is_empty) {
            self.last_notified_version = Some(tag.to_string());
        }
    }

    pub fn already_notified(&self, tag: &str) -> bool {
        self.last_notified_version.as_deref() == Some(tag)
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let Some(serde_json::Value::String(text)) = raw else {
        return Ok(None);
    };
    Ok(parse_timestamp(&text))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// File-backed store for [`NotificationState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved state.
    ///
    /// A missing, unreadable or corrupt file yields the empty state.
    pub fn load(&self) -> NotificationState {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file yet");
                return NotificationState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable, starting fresh");
                return NotificationState::default();
            }
        };

        match serde_json::from_str(&data) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file corrupt, starting fresh");
                NotificationState::default()
            }
        }
    }

    /// Replaces the saved state.
    ///
    /// The record is written to a temporary file next to the target and
    /// renamed over it, so readers see either the old or the new record.
    pub fn save(&self, state: &NotificationState) -> Result<(), StateError> {
        let mut data = serde_json::to_vec_pretty(state)?;
        data.push(b'\n');

        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&data).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}
