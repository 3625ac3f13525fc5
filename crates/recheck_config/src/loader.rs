//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::RunnerConfig;
use std::path::Path;

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE: &str = "recheck.toml";

/// Loads and validates a `recheck.toml` configuration from a project directory.
///
/// Reads `<project_dir>/recheck.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<RunnerConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `recheck.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<RunnerConfig, ConfigError> {
    let config: RunnerConfig =
        toml::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &RunnerConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name"));
    }
    if config.compile_db.path.is_empty() {
        return Err(ConfigError::MissingField("compile_db.path"));
    }
    if config.analysis.command.is_empty() {
        return Err(ConfigError::MissingField("analysis.command"));
    }
    if config.analysis.version_command.is_empty() {
        return Err(ConfigError::MissingField("analysis.version_command"));
    }
    if !config.analysis.command.contains("{file}") {
        return Err(ConfigError::Invalid {
            field: "analysis.command",
            problem: "has no {file} placeholder for the unit being analyzed",
        });
    }
    if config.units.extensions.is_empty() {
        return Err(ConfigError::Invalid {
            field: "units.extensions",
            problem: "lists no source extensions, so no unit would be analyzed",
        });
    }
    if config.jobs.parallelism == Some(0) {
        return Err(ConfigError::Invalid {
            field: "jobs.parallelism",
            problem: "must allow at least one concurrent job",
        });
    }
    if config.jobs.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            field: "jobs.timeout_secs",
            problem: "must be at least one second",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[project]
name = "demo"

[compile_db]
path = "build/compile_commands.json"

[analysis]
command = "clang-tidy -p . {file}"
version_command = "clang-tidy --version"
"#;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.source_root, ".");
        assert_eq!(config.compile_db.path, "build/compile_commands.json");
        assert!(config.compile_db.generate.is_none());
        assert_eq!(config.analysis.work_dir, ".");
    }

    #[test]
    fn default_values() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert!(config.analysis.multiline_output_fails);
        assert!(config.analysis.rules.is_empty());
        assert_eq!(config.units.extensions, vec![".cc"]);
        assert_eq!(config.units.exclude_suffixes, vec![".cxxtest.cc"]);
        assert!(config.units.exclude_prefixes.is_empty());
        assert_eq!(config.cache.path, "recheck_cache.json");
        assert_eq!(config.cache.dependency_dir, "dependencies");
        assert!(config.jobs.parallelism.is_none());
        assert_eq!(config.jobs.timeout_secs, 600);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "rosetta"
source_root = "source"

[compile_db]
path = "source/cmake/build_clang_tidy/compile_commands.json"
generate = "./build_compile_db.sh"

[analysis]
work_dir = "source/cmake/build_clang_tidy"
command = "clang-tidy -p . -quiet -checks='{rules}' {file}"
version_command = "clang-tidy --version"
rules = ["clang-diagnostic-*", "clang-analyzer-*"]
multiline_output_fails = false

[units]
extensions = [".cc", ".cpp"]
exclude_suffixes = [".cxxtest.cc"]
exclude_prefixes = ["src/apps/pilot", "src/devel"]

[cache]
path = "source/cmake/build_clang_tidy/tidy_results_cache.json"
dependency_dir = "source/cmake/build_clang_tidy/dependencies"

[jobs]
parallelism = 16
timeout_secs = 1200
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.source_root, "source");
        assert_eq!(
            config.compile_db.generate.as_deref(),
            Some("./build_compile_db.sh")
        );
        assert_eq!(config.analysis.rules.len(), 2);
        assert!(!config.analysis.multiline_output_fails);
        assert_eq!(config.units.extensions, vec![".cc", ".cpp"]);
        assert_eq!(config.units.exclude_prefixes.len(), 2);
        assert_eq!(config.jobs.parallelism, Some(16));
        assert_eq!(config.jobs.timeout_secs, 1200);
    }

    #[test]
    fn missing_name_errors() {
        let toml = MINIMAL.replace("name = \"demo\"", "name = \"\"");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("project.name")));
    }

    #[test]
    fn command_without_file_placeholder_errors() {
        let toml = MINIMAL.replace("clang-tidy -p . {file}", "clang-tidy -p .");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "analysis.command",
                ..
            }
        ));
    }

    #[test]
    fn zero_parallelism_errors() {
        let toml = format!("{MINIMAL}\n[jobs]\nparallelism = 0\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "jobs.parallelism",
                ..
            }
        ));
    }

    #[test]
    fn zero_timeout_errors() {
        let toml = format!("{MINIMAL}\n[jobs]\ntimeout_secs = 0\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "jobs.timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn missing_analysis_section_errors() {
        let toml = r#"
[project]
name = "demo"

[compile_db]
path = "compile_commands.json"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), MINIMAL).unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "demo");
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci-recheck.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.analysis.version_command, "clang-tidy --version");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        match err {
            ConfigError::Read { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/dir").join(CONFIG_FILE))
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
