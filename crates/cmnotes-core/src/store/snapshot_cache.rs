//! Disk-backed per-project note snapshots.
//!
//! Each project's reconciled notes are persisted as `cache-<project>.json`
//! inside the data directory and mirrored in memory. A snapshot is created on
//! the first successful load, replaced wholesale on every refresh and never
//! mutated in place.
//!
//! # Cache invalidation
//! A snapshot is stale once more than the TTL has elapsed since it was saved,
//! or after `clear_cache` / `clear_all`.
//!
//! # Session boundary
//! `SessionMarker::begin` writes `session.json` with a fresh token when the
//! process starts. Snapshots remember the token they were produced under, so
//! a snapshot written by an earlier session can be served immediately while
//! still being reconciled against ledger writes made since the last visit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Note;

const SESSION_FILE: &str = "session.json";

/// Wall-clock source, in unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// One project's notes as of `timestamp` (unix ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub data: Vec<Note>,
    pub timestamp: u64,
    pub project: String,
    /// Session the snapshot was produced in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh { timestamp: u64 },
    Stale { timestamp: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    token: Uuid,
    started_at: u64,
}

/// Identity of the current process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker {
    pub token: Uuid,
    pub started_at_ms: u64,
    /// When the previous session started, if one was recorded
    pub previous_load_ms: Option<u64>,
}

impl SessionMarker {
    /// Start a new session, recording it in `<data_dir>/session.json`.
    /// A marker that cannot be persisted is still valid for this process.
    pub fn begin(data_dir: &Path, clock: &dyn Clock) -> Self {
        let path = data_dir.join(SESSION_FILE);
        let previous_load_ms = std::fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<SessionFile>(&bytes).ok())
            .map(|previous| previous.started_at);

        let marker = Self {
            token: Uuid::new_v4(),
            started_at_ms: clock.now_ms(),
            previous_load_ms,
        };

        let file = SessionFile {
            token: marker.token,
            started_at: marker.started_at_ms,
        };
        if let Err(e) = write_json_atomic(data_dir, &path, &file) {
            tracing::warn!(error = %e, "snapshot_cache: failed to record session marker");
        }

        marker
    }
}

pub struct SnapshotCache {
    data_dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    session: SessionMarker,
    snapshots: RwLock<HashMap<String, Arc<CacheSnapshot>>>,
}

impl SnapshotCache {
    pub fn new(data_dir: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let data_dir = data_dir.into();
        let session = SessionMarker::begin(&data_dir, clock.as_ref());
        Self {
            data_dir,
            ttl,
            clock,
            session,
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &SessionMarker {
        &self.session
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Path of the snapshot file for `project`.
    pub fn cache_path(&self, project: &str) -> PathBuf {
        self.data_dir
            .join(format!("cache-{}.json", sanitize_key(project)))
    }

    /// Publish a new snapshot for `project`, replacing any previous one.
    ///
    /// Readers see either the old or the new snapshot, never a mix. A failed
    /// disk write is logged; the in-memory snapshot is still published.
    pub fn save_to_cache(&self, project: &str, data: Vec<Note>) -> Arc<CacheSnapshot> {
        let snapshot = Arc::new(CacheSnapshot {
            data,
            timestamp: self.clock.now_ms(),
            project: project.to_string(),
            session: Some(self.session.token),
        });

        if let Err(e) = write_json_atomic(&self.data_dir, &self.cache_path(project), snapshot.as_ref()) {
            tracing::warn!(project, error = %e, "snapshot_cache: failed to persist snapshot");
        }

        self.snapshots
            .write()
            .insert(project.to_string(), snapshot.clone());

        tracing::debug!(project, notes = snapshot.data.len(), "snapshot_cache: published");
        snapshot
    }

    /// Latest snapshot for `project` regardless of age.
    pub fn load_snapshot(&self, project: &str) -> Option<Arc<CacheSnapshot>> {
        if let Some(snapshot) = self.snapshots.read().get(project) {
            return Some(snapshot.clone());
        }

        let snapshot = Arc::new(self.read_from_disk(project)?);
        let mut snapshots = self.snapshots.write();
        // A refresh may have published while we were reading the file.
        let entry = snapshots
            .entry(project.to_string())
            .or_insert(snapshot);
        Some(entry.clone())
    }

    fn read_from_disk(&self, project: &str) -> Option<CacheSnapshot> {
        let bytes = std::fs::read(self.cache_path(project)).ok()?;
        match serde_json::from_slice::<CacheSnapshot>(&bytes) {
            Ok(snapshot) if snapshot.project == project => Some(snapshot),
            Ok(snapshot) => {
                tracing::info!(
                    project,
                    cached_project = %snapshot.project,
                    "snapshot_cache: project mismatch, discarding"
                );
                None
            }
            Err(e) => {
                tracing::info!(project, error = %e, "snapshot_cache: corrupt snapshot, discarding");
                None
            }
        }
    }

    /// Snapshot for `project` if it is still within the TTL.
    pub fn get_from_cache(&self, project: &str) -> Option<Arc<CacheSnapshot>> {
        self.load_snapshot(project)
            .filter(|snapshot| self.is_snapshot_valid(snapshot))
    }

    pub fn is_cache_valid(&self, project: &str) -> bool {
        self.get_from_cache(project).is_some()
    }

    /// Valid while the elapsed time is at most the TTL.
    pub fn is_snapshot_valid(&self, snapshot: &CacheSnapshot) -> bool {
        self.age_ms(snapshot) <= self.ttl.as_millis() as u64
    }

    pub fn age_ms(&self, snapshot: &CacheSnapshot) -> u64 {
        self.clock.now_ms().saturating_sub(snapshot.timestamp)
    }

    /// Produced before this process started.
    pub fn is_from_previous_session(&self, snapshot: &CacheSnapshot) -> bool {
        snapshot.session != Some(self.session.token)
    }

    pub fn state(&self, project: &str) -> CacheState {
        match self.load_snapshot(project) {
            None => CacheState::Empty,
            Some(snapshot) if self.is_snapshot_valid(&snapshot) => CacheState::Fresh {
                timestamp: snapshot.timestamp,
            },
            Some(snapshot) => CacheState::Stale {
                timestamp: snapshot.timestamp,
            },
        }
    }

    /// Drop the snapshot for `project`. Ignores a missing file.
    pub fn clear_cache(&self, project: &str) {
        self.snapshots.write().remove(project);
        let _ = std::fs::remove_file(self.cache_path(project));
    }

    /// Drop every project's snapshot.
    pub fn clear_all(&self) {
        self.snapshots.write().clear();
        let Ok(entries) = std::fs::read_dir(&self.data_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("cache-") && name.ends_with(".json") {
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }
}

/// Keep project keys filesystem-safe.
fn sanitize_key(project: &str) -> String {
    project
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write-to-temp-then-rename so an interrupted write never leaves a torn file.
fn write_json_atomic<T: Serialize + ?Sized>(data_dir: &Path, path: &Path, value: &T) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let bytes = serde_json::to_vec(value)?;
    let temp_file = path.with_extension("json.tmp");
    std::fs::write(&temp_file, &bytes)?;
    std::fs::rename(&temp_file, path)?;
    Ok(())
}
