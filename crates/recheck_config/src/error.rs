//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a `recheck.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read runner configuration {path}: {source}")]
    Read {
        /// The configuration file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the expected shape.
    #[error("runner configuration is malformed: {0}")]
    Malformed(String),

    /// A setting the runner cannot work without is absent or empty.
    #[error("runner configuration needs `{0}` to be set")]
    MissingField(&'static str),

    /// A setting has a value the runner cannot use.
    #[error("runner configuration `{field}` {problem}")]
    Invalid {
        /// Dotted name of the offending setting.
        field: &'static str,
        /// What is wrong with its value.
        problem: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_setting() {
        let err = ConfigError::MissingField("analysis.version_command");
        assert_eq!(
            err.to_string(),
            "runner configuration needs `analysis.version_command` to be set"
        );
    }

    #[test]
    fn invalid_value_reads_as_sentence() {
        let err = ConfigError::Invalid {
            field: "jobs.timeout_secs",
            problem: "must be at least one second",
        };
        assert_eq!(
            err.to_string(),
            "runner configuration `jobs.timeout_secs` must be at least one second"
        );
    }

    #[test]
    fn read_error_includes_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/ci/recheck.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            err.to_string(),
            "cannot read runner configuration /ci/recheck.toml: no such file"
        );
    }
}
