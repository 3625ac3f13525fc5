//! Enumerating analyzable units from a compilation database.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use recheck_config::UnitFilterConfig;
use serde::Deserialize;

use crate::error::RunError;
use crate::exec::shell_quote;

/// One analyzable source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Path relative to the source root, `/`-separated. Unique per run.
    pub id: String,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Compile command from the compilation database.
    pub command: String,
    /// Directory the compile command runs in.
    pub directory: PathBuf,
}

impl Unit {
    /// Location of this unit's dependency snapshot under `snapshot_dir`.
    pub fn snapshot_path(&self, snapshot_dir: &Path) -> PathBuf {
        snapshot_dir.join(format!("{}.d", self.id))
    }
}

/// One entry of `compile_commands.json`.
#[derive(Debug, Deserialize)]
struct CompileDbEntry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
}

impl CompileDbEntry {
    fn command_line(&self) -> Option<String> {
        match (&self.command, &self.arguments) {
            (Some(command), _) => Some(command.clone()),
            (None, Some(args)) if !args.is_empty() => Some(
                args.iter()
                    .map(|a| shell_quote(a))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        }
    }
}

/// Reads the compilation database at `db_path` and returns the units to analyze.
///
/// Only files under `source_root` that pass `filter` are kept. Units appear in
/// database order; a file listed twice keeps its first entry. An empty result
/// is an error, since a run with nothing to reason about cannot be trusted.
pub fn enumerate_units(
    db_path: &Path,
    source_root: &Path,
    filter: &UnitFilterConfig,
) -> Result<Vec<Unit>, RunError> {
    let content = std::fs::read_to_string(db_path).map_err(|e| RunError::CompileDbIo {
        path: db_path.to_path_buf(),
        source: e,
    })?;
    let entries: Vec<CompileDbEntry> =
        serde_json::from_str(&content).map_err(|e| RunError::CompileDbParse {
            path: db_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut units = Vec::new();
    for entry in entries {
        let path = entry.directory.join(&entry.file);
        let Ok(relative) = path.strip_prefix(source_root) else {
            tracing::trace!("skipping {} outside the source root", path.display());
            continue;
        };
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !filter.accepts(&id) || !seen.insert(id.clone()) {
            continue;
        }
        let Some(command) = entry.command_line() else {
            tracing::warn!("{id}: compilation database entry has no command, skipping");
            continue;
        };
        units.push(Unit {
            id,
            path,
            command,
            directory: entry.directory,
        });
    }

    if units.is_empty() {
        return Err(RunError::NoUnits(db_path.to_path_buf()));
    }
    tracing::debug!("enumerated {} units from {}", units.len(), db_path.display());
    Ok(units)
}
