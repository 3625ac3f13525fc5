//! Configuration types deserialized from `recheck.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The top-level runner configuration parsed from `recheck.toml`.
///
/// Describes the project layout, the compilation database that enumerates
/// units, the analysis command run per unit, unit filtering, cache locations,
/// and job scheduling limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Core project metadata (name and source root).
    pub project: ProjectMeta,
    /// Location (and optional generator) of the compilation database.
    pub compile_db: CompileDbConfig,
    /// How each unit is analyzed and how the tool is identified.
    pub analysis: AnalysisConfig,
    /// Which compilation database entries count as units.
    #[serde(default)]
    pub units: UnitFilterConfig,
    /// Result cache and dependency snapshot locations.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Parallelism and per-job timeout.
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Project metadata required in every `recheck.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name, used in progress output.
    pub name: String,
    /// Directory whose prefix is stripped from compilation database paths to
    /// form unit identifiers. Relative to the project directory.
    #[serde(default = "default_source_root")]
    pub source_root: String,
}

/// Compilation database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileDbConfig {
    /// Path to `compile_commands.json`.
    pub path: String,
    /// Optional shell command that (re)generates the database before a run.
    /// Executed in the analysis working directory.
    #[serde(default)]
    pub generate: Option<String>,
}

/// Analysis command settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Working directory for analysis jobs.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    /// Analysis command template. `{file}` is replaced with the unit's
    /// absolute path and `{rules}` with the rule-set identifier.
    pub command: String,
    /// Command whose trimmed output identifies the analyzer version.
    pub version_command: String,
    /// Active analysis rules. Joined with `,` to form the rule-set identifier.
    #[serde(default)]
    pub rules: Vec<String>,
    /// Treat a zero exit status with more than one line of output as a failure.
    #[serde(default = "default_true")]
    pub multiline_output_fails: bool,
}

/// Unit filtering applied to compilation database entries.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitFilterConfig {
    /// File extensions (with leading dot) that identify analyzable units.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Relative-path suffixes excluded from analysis.
    #[serde(default = "default_exclude_suffixes")]
    pub exclude_suffixes: Vec<String>,
    /// Relative-path prefixes excluded from analysis.
    #[serde(default = "default_exclude_prefixes")]
    pub exclude_prefixes: Vec<String>,
}

/// Result cache and dependency snapshot locations.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Path of the persisted result cache.
    #[serde(default = "default_cache_path")]
    pub path: String,
    /// Directory holding one `<unit>.d` dependency snapshot per unit.
    #[serde(default = "default_dependency_dir")]
    pub dependency_dir: String,
}

/// Job scheduling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Maximum number of concurrent analysis jobs. Defaults to the number of
    /// available cores.
    #[serde(default)]
    pub parallelism: Option<usize>,
    /// Per-job timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RunnerConfig {
    /// Resolves a configured path against the project directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(project_dir: &Path, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            project_dir.join(p)
        }
    }
}

impl AnalysisConfig {
    /// Identifier of the active rule set, recorded in the result cache.
    pub fn rule_set_id(&self) -> String {
        self.rules.join(",")
    }
}

impl UnitFilterConfig {
    /// Returns `true` if a unit with the given relative path should be analyzed.
    pub fn accepts(&self, relative: &str) -> bool {
        self.extensions.iter().any(|ext| relative.ends_with(ext.as_str()))
            && !self
                .exclude_suffixes
                .iter()
                .any(|s| relative.ends_with(s.as_str()))
            && !self
                .exclude_prefixes
                .iter()
                .any(|p| relative.starts_with(p.as_str()))
    }
}

impl JobsConfig {
    /// Parallelism to use, falling back to the number of available cores.
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

impl Default for UnitFilterConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_suffixes: default_exclude_suffixes(),
            exclude_prefixes: default_exclude_prefixes(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            dependency_dir: default_dependency_dir(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            parallelism: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_source_root() -> String {
    ".".to_string()
}

fn default_work_dir() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec![".cc".to_string()]
}

fn default_exclude_suffixes() -> Vec<String> {
    vec![".cxxtest.cc".to_string()]
}

fn default_exclude_prefixes() -> Vec<String> {
    Vec::new()
}

fn default_cache_path() -> String {
    "recheck_cache.json".to_string()
}

fn default_dependency_dir() -> String {
    "dependencies".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const MINIMAL: &str = r#"
[project]
name = "demo"

[compile_db]
path = "build/compile_commands.json"

[analysis]
command = "clang-tidy -p . -checks='{rules}' {file}"
version_command = "clang-tidy --version"
rules = ["bugprone-*", "-bugprone-forward-declaration-namespace"]
"#;

    #[test]
    fn rule_set_id_joins_rules() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(
            config.analysis.rule_set_id(),
            "bugprone-*,-bugprone-forward-declaration-namespace"
        );
    }

    #[test]
    fn filter_accepts_matching_extension() {
        let filter = UnitFilterConfig::default();
        assert!(filter.accepts("src/core/pose/Pose.cc"));
        assert!(!filter.accepts("src/core/pose/Pose.hh"));
    }

    #[test]
    fn filter_rejects_excluded_suffix_and_prefix() {
        let filter = UnitFilterConfig {
            extensions: vec![".cc".to_string()],
            exclude_suffixes: vec![".cxxtest.cc".to_string(), "libsvm/Svm.cc".to_string()],
            exclude_prefixes: vec!["src/apps/pilot".to_string(), "src/devel".to_string()],
        };
        assert!(!filter.accepts("test/core/Pose.cxxtest.cc"));
        assert!(!filter.accepts("src/utility/libsvm/Svm.cc"));
        assert!(!filter.accepts("src/apps/pilot/will/app.cc"));
        assert!(!filter.accepts("src/devel/splice/Splice.cc"));
        assert!(filter.accepts("src/protocols/loops/Loops.cc"));
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let dir = Path::new("/work/project");
        assert_eq!(
            RunnerConfig::resolve(dir, "build/cache.json"),
            PathBuf::from("/work/project/build/cache.json")
        );
        assert_eq!(
            RunnerConfig::resolve(dir, "/tmp/cache.json"),
            PathBuf::from("/tmp/cache.json")
        );
    }

    #[test]
    fn explicit_parallelism_wins() {
        let jobs = JobsConfig {
            parallelism: Some(3),
            timeout_secs: 10,
        };
        assert_eq!(jobs.effective_parallelism(), 3);
    }

    #[test]
    fn default_parallelism_is_positive() {
        assert!(JobsConfig::default().effective_parallelism() >= 1);
    }
}
