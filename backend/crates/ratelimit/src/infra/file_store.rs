//! File-backed Counter Store
//!
//! One JSON table per protocol in the run directory (usually tmpfs):
//!
//! - `<proto>.rate_limits.json`       counter table
//! - `<proto>.rate_limits.json.lock`  `flock` target, never holds data
//! - `<proto>.last_expired`           expiry marker, only its mtime matters
//!
//! Writers replace the table atomically so a reader that skips the lock
//! still sees either the old or the new table.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use platform::file_lock::{FileLockGuard, LockMode};
use tempfile::NamedTempFile;

use crate::domain::repository::CounterStore;
use crate::domain::table::RateLimitTable;
use crate::error::{RateLimitError, RateLimitResult};

const RATE_LIMITS_FILENAME: &str = "rate_limits.json";
const LAST_EXPIRED_FILENAME: &str = "last_expired";

/// Counter store over a shared run directory
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    run_dir: PathBuf,
}

impl FileCounterStore {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn table_path(&self, proto: &str) -> PathBuf {
        self.run_dir
            .join(format!("{}.{}", proto, RATE_LIMITS_FILENAME))
    }

    pub fn lock_path(&self, proto: &str) -> PathBuf {
        self.run_dir
            .join(format!("{}.{}.lock", proto, RATE_LIMITS_FILENAME))
    }

    pub fn marker_path(&self, proto: &str) -> PathBuf {
        self.run_dir
            .join(format!("{}.{}", proto, LAST_EXPIRED_FILENAME))
    }

    fn lock(&self, proto: &str, mode: LockMode) -> RateLimitResult<FileLockGuard> {
        check_proto(proto)?;
        let path = self.lock_path(proto);
        FileLockGuard::acquire(&path, mode).map_err(|source| RateLimitError::Lock { path, source })
    }
}

// Protocol names become file names in the run directory.
fn check_proto(proto: &str) -> RateLimitResult<()> {
    let valid = !proto.is_empty()
        && !proto.starts_with('.')
        && proto
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(RateLimitError::InvalidProtocol(proto.to_string()))
    }
}

impl CounterStore for FileCounterStore {
    fn load(&self, proto: &str) -> RateLimitResult<RateLimitTable> {
        check_proto(proto)?;
        let path = self.table_path(proto);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(RateLimitTable::new());
            }
            Err(source) => return Err(RateLimitError::Load { path, source }),
        };

        match serde_json::from_slice::<RateLimitTable>(&raw) {
            Ok(table) => {
                if !table.totals_consistent() {
                    tracing::warn!(proto, path = %path.display(), "Rate limit totals out of sync");
                }
                Ok(table)
            }
            Err(err) => {
                tracing::warn!(
                    proto,
                    path = %path.display(),
                    error = %err,
                    "Failed to parse rate limits, starting from an empty table"
                );
                Ok(RateLimitTable::new())
            }
        }
    }

    fn save(&self, proto: &str, table: &RateLimitTable) -> RateLimitResult<()> {
        check_proto(proto)?;
        let path = self.table_path(proto);
        let encoded = serde_json::to_vec(table)?;

        let save_err = |source: io::Error| RateLimitError::Save {
            path: path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.run_dir).map_err(save_err)?;
        tmp.write_all(&encoded).map_err(save_err)?;
        tmp.persist(&path).map_err(|e| save_err(e.error))?;

        tracing::trace!(proto, bytes = encoded.len(), "Saved rate limits");
        Ok(())
    }

    fn read(&self, proto: &str) -> RateLimitResult<RateLimitTable> {
        let _guard = self.lock(proto, LockMode::Shared)?;
        self.load(proto)
    }

    fn update<R, F>(&self, proto: &str, f: F) -> RateLimitResult<R>
    where
        F: FnOnce(&mut RateLimitTable) -> R,
    {
        let _guard = self.lock(proto, LockMode::Exclusive)?;
        let mut table = self.load(proto)?;
        let result = f(&mut table);
        self.save(proto, &table)?;
        Ok(result)
    }

    fn last_expired(&self, proto: &str) -> RateLimitResult<Option<DateTime<Utc>>> {
        check_proto(proto)?;
        let path = self.marker_path(proto);
        match fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(modified) => Ok(Some(DateTime::<Utc>::from(modified))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RateLimitError::Marker { path, source }),
        }
    }

    fn mark_expired(&self, proto: &str) -> RateLimitResult<()> {
        check_proto(proto)?;
        let path = self.marker_path(proto);
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(SystemTime::now()))
            .map_err(|source| RateLimitError::Marker { path, source })
    }
}
