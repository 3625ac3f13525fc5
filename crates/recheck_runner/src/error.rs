//! Error types for a runner invocation.

use std::path::PathBuf;

use recheck_cache::CacheError;

/// Errors that stop a run.
///
/// Failures of individual analysis jobs are never errors; they are recorded
/// as failed outcomes in the report.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The result cache could not be written or read.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The project directory could not be resolved to an absolute path.
    #[error("cannot resolve project directory {path}: {source}")]
    ProjectDir {
        /// The directory as given.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compilation database could not be read.
    #[error("failed to read compilation database {path}: {source}")]
    CompileDbIo {
        /// The database path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compilation database is not valid JSON of the expected shape.
    #[error("malformed compilation database {path}: {reason}")]
    CompileDbParse {
        /// The database path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The compilation database yielded no units after filtering.
    #[error("compilation database {0} contains no units to analyze")]
    NoUnits(PathBuf),

    /// The command that generates the compilation database failed.
    #[error("couldn't create compilation database with `{command}`:\n{output}")]
    CompileDbGeneration {
        /// The generator command.
        command: String,
        /// Its captured output.
        output: String,
    },

    /// The analyzer version could not be determined.
    #[error("couldn't figure out analyzer version with `{command}`:\n{output}")]
    ToolVersion {
        /// The version command.
        command: String,
        /// Its captured output.
        output: String,
    },
}
