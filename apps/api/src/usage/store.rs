//! Usage Store: persisted mapping from caller identifier to last-use time.
//!
//! On-disk layout is a single JSON object:
//! `{ "<user_id>": { "last_used": <unix-epoch-seconds float> } }`.
//! Every save replaces the whole file (temp file + rename in the same directory).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("usage file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("usage file at {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("usage snapshot could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unix epoch seconds of the last successful evaluation.
    pub last_used: f64,
}

/// Whole-store snapshot. At most one record per identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageSnapshot(BTreeMap<String, UsageRecord>);

impl UsageSnapshot {
    pub fn get(&self, user_id: &str) -> Option<&UsageRecord> {
        self.0.get(user_id)
    }

    pub fn last_used(&self, user_id: &str) -> Option<f64> {
        self.get(user_id).map(|r| r.last_used)
    }

    /// Inserts or overwrites the record for `user_id`.
    pub fn upsert(&mut self, user_id: &str, last_used: f64) {
        self.0
            .insert(user_id.to_string(), UsageRecord { last_used });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for UsageSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, t)| (k.into(), UsageRecord { last_used: t }))
                .collect(),
        )
    }
}

/// JSON file backing a [`UsageSnapshot`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot. A missing file is created as `{}` and read as empty.
    pub fn load(&self) -> Result<UsageSnapshot, StoreError> {
        if !self.path.exists() {
            info!("Usage file {} not found, creating it", self.path.display());
            let empty = UsageSnapshot::default();
            self.save(&empty)?;
            return Ok(empty);
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`load`](Self::load), but any failure yields an empty snapshot.
    pub fn load_or_default(&self) -> UsageSnapshot {
        match self.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Falling back to an empty usage store: {e}");
                UsageSnapshot::default()
            }
        }
    }

    /// Replaces the file contents with `snapshot`.
    pub fn save(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        let body = serde_json::to_vec(snapshot).map_err(StoreError::Encode)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

/// Result of a compare-and-swap commit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommitOutcome {
    Written,
    /// Another request changed the record after the gate was evaluated;
    /// the existing record was kept.
    Conflict { current: Option<f64> },
}

/// In-process single writer for the usage file.
///
/// The file is read once at startup. All commits go through the mutex, so
/// requests within this process never clobber each other.
pub struct UsageLedger {
    file: JsonFileStore,
    snapshot: Mutex<UsageSnapshot>,
}

impl UsageLedger {
    /// Loads the file leniently: unreadable or corrupt contents start empty.
    pub fn open(file: JsonFileStore) -> Self {
        let snapshot = file.load_or_default();
        info!(
            "Usage store loaded from {} ({} records)",
            file.path().display(),
            snapshot.len()
        );
        Self {
            file,
            snapshot: Mutex::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> UsageSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// Applies `next` only if the record for `user_id` still equals `expected`,
    /// then persists the whole snapshot.
    pub async fn compare_and_swap<F>(
        &self,
        user_id: &str,
        expected: Option<f64>,
        next: F,
    ) -> Result<CommitOutcome, StoreError>
    where
        F: FnOnce(UsageSnapshot) -> UsageSnapshot,
    {
        let mut guard = self.snapshot.lock().await;
        let current = guard.last_used(user_id);
        if current != expected {
            warn!(
                "Usage record for {user_id} changed concurrently (expected {expected:?}, found {current:?}); keeping existing record"
            );
            return Ok(CommitOutcome::Conflict { current });
        }

        let updated = next(guard.clone());
        if updated == *guard {
            return Ok(CommitOutcome::Written);
        }

        let file = self.file.clone();
        let to_write = updated.clone();
        tokio::task::spawn_blocking(move || file.save(&to_write))
            .await
            .map_err(|e| StoreError::Io {
                path: self.file.path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            })??;

        *guard = updated;
        Ok(CommitOutcome::Written)
    }
}
