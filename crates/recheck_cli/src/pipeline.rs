//! Shared helpers for CLI commands.
//!
//! Contains project root resolution, configuration loading and report
//! rendering used by `run`, `status`, and `clean`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use recheck_config::{RunnerConfig, CONFIG_FILE};
use recheck_runner::Report;

use crate::GlobalArgs;

/// Number of output lines shown per failing unit in the text report.
const SNIPPET_LINES: usize = 20;

/// Walks up from `start` looking for the nearest directory containing `recheck.toml`.
///
/// Returns the directory containing `recheck.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project directory and loads its configuration.
///
/// If `--config` names a file, that file is loaded and its parent is the
/// project directory; if it names a directory, `recheck.toml` is loaded from
/// there. Otherwise walks up from the current directory. The returned
/// directory is absolute, since analysis jobs change directory before using
/// any path derived from it.
pub fn load_project(
    global: &GlobalArgs,
) -> Result<(PathBuf, RunnerConfig), Box<dyn std::error::Error>> {
    let (project_dir, config) = match global.config {
        Some(ref config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_file() {
                let dir = match p.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                (dir, recheck_config::load_config_file(&p)?)
            } else {
                let config = recheck_config::load_config(&p)?;
                (p, config)
            }
        }
        None => {
            let dir = find_project_root(&std::env::current_dir()?)?;
            let config = recheck_config::load_config(&dir)?;
            (dir, config)
        }
    };
    let project_dir = std::fs::canonicalize(&project_dir)?;
    tracing::debug!("using project at {}", project_dir.display());
    Ok((project_dir, config))
}

/// Renders the failing units of `report` for the terminal.
///
/// Each failing unit shows the first lines of its analysis output.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    for unit in &report.failed_units {
        let _ = writeln!(out, "   FAIL  {unit}");
        if let Some(outcome) = report.details.get(unit) {
            let lines: Vec<&str> = outcome.output.trim_end().lines().collect();
            for line in lines.iter().take(SNIPPET_LINES) {
                let _ = writeln!(out, "         {line}");
            }
            if lines.len() > SNIPPET_LINES {
                let _ = writeln!(
                    out,
                    "         ... ({} more line(s))",
                    lines.len() - SNIPPET_LINES
                );
            }
        }
    }
    out
}

/// Writes `content` to `output`, or to standard output when no file is given.
pub fn emit(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => print!("{content}"),
    }
    Ok(())
}
