//! Reading compiler-generated dependency snapshots.
//!
//! A snapshot is the make-style listing written by `-MM -MF <file>`: a target
//! line followed by whitespace-prefixed continuation lines naming every file
//! the unit's compilation pulled in.
//!
//! ```text
//! Loops.o: src/protocols/loops/Loops.cc \
//!  src/protocols/loops/Loops.hh src/core/pose/Pose.hh \
//!  src/utility/vector1.hh
//! ```
//!
//! Every token except the leading `target:` and the `\` line continuations
//! names a file, so the set covers the unit's own source file as well as
//! everything it includes.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// The set of files a unit's last compilation depended on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySnapshot {
    files: BTreeSet<PathBuf>,
}

impl DependencySnapshot {
    /// Parses the textual contents of a dependency listing.
    pub fn parse(content: &str) -> Self {
        let files = content
            .lines()
            .flat_map(|line| {
                let skip = usize::from(!line.starts_with(char::is_whitespace));
                line.split_whitespace().skip(skip)
            })
            .filter(|token| *token != "\\")
            .map(PathBuf::from)
            .collect();
        Self { files }
    }

    /// Returns the dependency paths in sorted order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

/// Reads the dependency snapshot at `path`.
///
/// Returns `Ok(None)` when the file does not exist: the unit was never
/// analyzed and must be run. Any other read failure is an error.
pub fn read_snapshot(path: &Path) -> Result<Option<DependencySnapshot>, CacheError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(DependencySnapshot::parse(&content))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
