//! Deciding whether a unit's cached outcome can be reused.
//!
//! Every check compares file modification times against one reference point:
//! the modification time of the result cache when it was loaded. A unit is
//! reused only when its last run passed, its dependency snapshot predates the
//! cache, and nothing the snapshot lists has been modified since.

use std::fmt;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::snapshot::read_snapshot;
use crate::store::{CacheEntry, CacheStore};

/// Why a unit must be analyzed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The unit has no cache entry.
    NotCached,
    /// The last run of the unit did not succeed.
    PreviouslyFailed,
    /// No dependency snapshot exists for the unit.
    MissingSnapshot,
    /// The snapshot was written at or after the cache was saved.
    SnapshotChanged,
    /// A file listed in the snapshot is newer than the cache, or unreadable.
    DependencyChanged(PathBuf),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCached => write!(f, "not in the cache"),
            Self::PreviouslyFailed => write!(f, "did not complete successfully last time"),
            Self::MissingSnapshot => write!(f, "has no dependency file"),
            Self::SnapshotChanged => write!(f, "has changed since the last run"),
            Self::DependencyChanged(dep) => write!(
                f,
                "uses {} which has changed since the last run",
                dep.display()
            ),
        }
    }
}

/// Outcome of the staleness check for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The cached entry can be reused as-is.
    Cached(CacheEntry),
    /// The unit must be analyzed again.
    Stale(StaleReason),
}

impl Decision {
    /// Returns `true` if the unit must be analyzed again.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Decides whether the cached outcome of `unit_id` can be trusted.
///
/// `snapshot_path` is where the unit's dependency listing is kept and
/// `compile_dir` the directory its compile command runs in, against which
/// relative dependency paths are resolved. Checks run in order and stop at
/// the first reason to re-analyze.
pub fn decide(
    unit_id: &str,
    snapshot_path: &Path,
    compile_dir: &Path,
    store: &CacheStore,
) -> Decision {
    let Some(entry) = store.get(unit_id) else {
        return Decision::Stale(StaleReason::NotCached);
    };
    if !entry.passed() {
        return Decision::Stale(StaleReason::PreviouslyFailed);
    }

    let snapshot_mtime = match std::fs::metadata(snapshot_path) {
        Ok(meta) => FileTime::from_last_modification_time(&meta),
        Err(_) => return Decision::Stale(StaleReason::MissingSnapshot),
    };
    let Some(reference) = store.reference_time() else {
        return Decision::Stale(StaleReason::SnapshotChanged);
    };
    if snapshot_mtime >= reference {
        return Decision::Stale(StaleReason::SnapshotChanged);
    }

    let snapshot = match read_snapshot(snapshot_path) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return Decision::Stale(StaleReason::MissingSnapshot),
        Err(e) => {
            tracing::debug!("{unit_id}: {e}");
            return Decision::Stale(StaleReason::MissingSnapshot);
        }
    };

    for dep in snapshot.files() {
        if !modified_before(&compile_dir.join(dep), reference) {
            return Decision::Stale(StaleReason::DependencyChanged(dep.to_path_buf()));
        }
    }

    Decision::Cached(entry.clone())
}

/// `true` if `path` exists and was last modified no later than `reference`.
fn modified_before(path: &Path, reference: FileTime) -> bool {
    std::fs::metadata(path)
        .map(|meta| FileTime::from_last_modification_time(&meta) <= reference)
        .unwrap_or(false)
}
