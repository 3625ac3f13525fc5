//! Persisted per-unit result cache.
//!
//! The store maps each unit's relative path to its last recorded outcome and
//! carries two invalidation tags: the active rule-set identifier and the
//! analyzer version. A change to either tag discards every entry.
//!
//! The modification time of the cache file itself, captured at load, is the
//! single reference point against which dependency snapshots are compared.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use filetime::FileTime;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Last recorded outcome of analyzing one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Exit status of the analysis job. Zero is success.
    pub result: i32,
    /// Captured output of the job.
    pub output: String,
}

impl CacheEntry {
    /// Creates a new entry.
    pub fn new(result: i32, output: impl Into<String>) -> Self {
        Self {
            result,
            output: output.into(),
        }
    }

    /// Returns `true` if the recorded run succeeded.
    pub fn passed(&self) -> bool {
        self.result == 0
    }
}

/// On-disk layout of the cache file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedCache {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    rule_set_id: String,
    #[serde(default)]
    tool_version_id: String,
}

/// In-memory result cache for one run.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: BTreeMap<String, CacheEntry>,
    rule_set_id: String,
    tool_version_id: String,
    reference_time: Option<FileTime>,
}

impl CacheStore {
    /// Creates an empty store with blank tags and no reference time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store persisted at `path`.
    ///
    /// A missing file yields an empty store. A file that cannot be parsed
    /// yields [`CacheError::Parse`].
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let metadata = std::fs::metadata(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let persisted: PersistedCache =
            serde_json::from_str(&content).map_err(|e| CacheError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            entries: persisted.entries,
            rule_set_id: persisted.rule_set_id,
            tool_version_id: persisted.tool_version_id,
            reference_time: Some(FileTime::from_last_modification_time(&metadata)),
        })
    }

    /// Loads the store at `path`, falling back to an empty store on any error.
    ///
    /// The failure is logged; a damaged cache only costs a full re-run.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("prior run cache is unusable, starting empty: {e}");
                Self::new()
            }
        }
    }

    /// Checks the recorded tags against the current ones.
    ///
    /// If either differs, every entry is dropped. The supplied tags become the
    /// store's tags in all cases. Returns `true` if entries were discarded.
    pub fn validate_tags(&mut self, rule_set_id: &str, tool_version_id: &str) -> bool {
        let mut invalidated = false;
        if !self.entries.is_empty() {
            if self.rule_set_id != rule_set_id {
                tracing::info!("clearing cached results: rule set changed");
                invalidated = true;
            } else if self.tool_version_id != tool_version_id {
                tracing::info!("clearing cached results: tool version changed");
                invalidated = true;
            }
        }
        if invalidated {
            self.entries.clear();
        }
        self.rule_set_id = rule_set_id.to_string();
        self.tool_version_id = tool_version_id.to_string();
        invalidated
    }

    /// Returns the cached entry for a unit.
    pub fn get(&self, unit_id: &str) -> Option<&CacheEntry> {
        self.entries.get(unit_id)
    }

    /// Records the entry for a unit, replacing any previous one.
    pub fn put(&mut self, unit_id: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(unit_id.into(), entry);
    }

    /// Keeps only the entries whose unit id satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|id, _| keep(id));
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no cached entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The rule-set tag.
    pub fn rule_set_id(&self) -> &str {
        &self.rule_set_id
    }

    /// The tool-version tag.
    pub fn tool_version_id(&self) -> &str {
        &self.tool_version_id
    }

    /// Modification time of the cache file when it was loaded.
    ///
    /// `None` when no cache file existed.
    pub fn reference_time(&self) -> Option<FileTime> {
        self.reference_time
    }

    /// Writes the entries and tags to `path`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let persisted = PersistedCache {
            entries: self.entries.clone(),
            rule_set_id: self.rule_set_id.clone(),
            tool_version_id: self.tool_version_id.clone(),
        };
        let json =
            serde_json::to_string_pretty(&persisted).map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        std::fs::write(path, json).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Deletes the cache file at `path`. Returns `false` if there was none.
    pub fn remove(path: &Path) -> Result<bool, CacheError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
