//! Append-only interaction log store.
//!
//! One JSON file per completed turn, named
//! `{agent_name}_{YYYYMMDD_HHMMSS}_{6 hex}.json`. The timestamp comes from the
//! last message of the record; the hex suffix keeps names unique within a
//! second. Files are written under a temporary name and linked into place
//! without replacing existing files, so readers never see a partial record.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transcript::ModelMessage;

const NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSource {
    User,
    AiGenerated,
}

impl LogSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::AiGenerated => "ai-generated",
        }
    }
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable snapshot of one completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub agent_name: String,
    pub system_prompt: String,
    pub provider: String,
    pub model: String,
    pub tools: Vec<String>,
    pub messages: Vec<ModelMessage>,
    pub source: LogSource,
}

#[derive(Debug, thiserror::Error)]
pub enum LogWriteError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write log file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not find a free log file name after {0} attempts")]
    NameCollision(usize),

    #[error("agent name {0:?} cannot be used in a log file name")]
    InvalidAgentName(String),
}

/// A record read back from disk.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub path: PathBuf,
    pub record: LogRecord,
}

/// Records loaded from a directory plus the files that could not be parsed.
#[derive(Debug, Default)]
pub struct LoadedLogs {
    pub records: Vec<StoredRecord>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `record` and return the path of the new file.
    ///
    /// # Errors
    ///
    /// Returns [`LogWriteError`] if the directory cannot be created, the record
    /// cannot be serialized or the file cannot be written.
    pub fn append(&self, record: &LogRecord) -> Result<PathBuf, LogWriteError> {
        if !is_valid_agent_name(&record.agent_name) {
            return Err(LogWriteError::InvalidAgentName(record.agent_name.clone()));
        }
        std::fs::create_dir_all(&self.dir).map_err(|source| LogWriteError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let json = serde_json::to_vec_pretty(record)?;
        let stamp = record_timestamp(&record.messages)
            .format("%Y%m%d_%H%M%S")
            .to_string();
        let tmp = self.write_temp(&json)?;

        for _ in 0..NAME_ATTEMPTS {
            let name = format!("{}_{stamp}_{}.json", record.agent_name, random_hex());
            let path = self.dir.join(&name);
            match place_new(&tmp, &path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), source = %record.source, "interaction logged");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "log name taken, retrying");
                }
                Err(source) => {
                    let _ = std::fs::remove_file(&tmp);
                    return Err(LogWriteError::Write { path, source });
                }
            }
        }

        let _ = std::fs::remove_file(&tmp);
        Err(LogWriteError::NameCollision(NAME_ATTEMPTS))
    }

    fn write_temp(&self, bytes: &[u8]) -> Result<PathBuf, LogWriteError> {
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()
        };
        match write() {
            Ok(()) => Ok(tmp),
            Err(source) => {
                let _ = std::fs::remove_file(&tmp);
                Err(LogWriteError::Write { path: tmp, source })
            }
        }
    }

    /// Read every `*.json` record in the directory, sorted by file name.
    ///
    /// Unreadable or malformed files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory itself cannot be listed.
    pub fn load_all(&self) -> std::io::Result<LoadedLogs> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort();

        let mut loaded = LoadedLogs::default();
        for path in paths {
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<LogRecord>(&s).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => loaded.records.push(StoredRecord { path, record }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable log record: {e}");
                    loaded.skipped += 1;
                }
            }
        }
        Ok(loaded)
    }
}

/// Move the finished temp file to `path` without replacing anything there.
///
/// Fails with [`std::io::ErrorKind::AlreadyExists`] when `path` is taken; `tmp`
/// is left in place for the next attempt.
fn place_new(tmp: &Path, path: &Path) -> std::io::Result<()> {
    match std::fs::hard_link(tmp, path) {
        Ok(()) => {
            let _ = std::fs::remove_file(tmp);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            tracing::debug!("hard link unavailable, reserving name instead: {e}");
            reserve_and_rename(tmp, path)
        }
    }
}

/// Claim `path` with an exclusive create, then move `tmp` onto the claimed file.
fn reserve_and_rename(tmp: &Path, path: &Path) -> std::io::Result<()> {
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    std::fs::rename(tmp, path)
}

/// Agent names become part of a file name: no separators, no `..`.
#[must_use]
pub fn is_valid_agent_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// Timestamp of the last message, falling back to now when absent or malformed.
#[must_use]
pub fn record_timestamp(messages: &[ModelMessage]) -> DateTime<Utc> {
    let Some(raw) = messages.last().and_then(|m| m.timestamp.as_deref()) else {
        return Utc::now();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!(timestamp = raw, "unparsable message timestamp, using current time: {e}");
            Utc::now()
        }
    }
}

fn random_hex() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    simple[..6].to_owned()
}
