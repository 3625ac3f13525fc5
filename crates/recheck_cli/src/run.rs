//! `recheck run`, the incremental analysis pipeline.
//!
//! 1. Find project root (walk up looking for `recheck.toml`)
//! 2. Load config via `recheck_config` and apply CLI overrides
//! 3. Run the analysis through `recheck_runner`
//! 4. Render the report

use recheck_config::RunnerConfig;
use recheck_runner::{RunSummary, Runner};

use crate::pipeline::{emit, load_project, render_report};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `recheck run` command.
///
/// Returns exit code 0 if every unit passed, 1 if any failed.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (project_dir, mut config) = load_project(global)?;
    apply_overrides(&mut config, args);

    if !global.quiet {
        eprintln!("   Checking {}", config.project.name);
    }

    let runner = Runner::new(config, &project_dir)?;
    let summary = runner.run()?;

    if !global.quiet {
        if summary.invalidated {
            eprintln!("   Discarded cached results (rule set or analyzer version changed)");
        }
        eprintln!(
            "   Reused {} cached result(s), analyzed {} unit(s) in {:.1}s",
            summary.cached,
            summary.dispatched,
            summary.elapsed.as_secs_f64()
        );
    }

    match args.format {
        ReportFormat::Text => {
            let text = render_report(&summary.report);
            match args.output {
                Some(ref path) => emit(&text, Some(path.as_path()))?,
                None => eprint!("{text}"),
            }
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&summary.report)?;
            emit(&format!("{json}\n"), args.output.as_deref())?;
        }
    }

    if !global.quiet {
        eprintln!("   Result: {}", result_line(&summary));
    }

    Ok(if summary.report.passed() { 0 } else { 1 })
}

/// Applies `--jobs` and `--timeout` on top of the configured values.
fn apply_overrides(config: &mut RunnerConfig, args: &RunArgs) {
    if let Some(jobs) = args.jobs {
        config.jobs.parallelism = Some(jobs as usize);
    }
    if let Some(timeout) = args.timeout {
        config.jobs.timeout_secs = timeout;
    }
}

fn result_line(summary: &RunSummary) -> String {
    let report = &summary.report;
    format!(
        "{} passed, {} failed out of {} unit(s)",
        report.total - report.failed,
        report.failed,
        report.total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use recheck_runner::Report;
    use std::time::Duration;

    fn config() -> RunnerConfig {
        recheck_config::load_config_from_str(
            r#"
[project]
name = "t"

[compile_db]
path = "compile_commands.json"

[analysis]
command = "tidy {file}"
version_command = "tidy --version"

[jobs]
parallelism = 4
timeout_secs = 600
"#,
        )
        .unwrap()
    }

    fn args(jobs: Option<u32>, timeout: Option<u64>) -> RunArgs {
        RunArgs {
            jobs,
            timeout,
            format: ReportFormat::Text,
            output: None,
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = config();
        apply_overrides(&mut config, &args(Some(16), Some(30)));
        assert_eq!(config.jobs.parallelism, Some(16));
        assert_eq!(config.jobs.timeout_secs, 30);
    }

    #[test]
    fn absent_overrides_keep_config_values() {
        let mut config = config();
        apply_overrides(&mut config, &args(None, None));
        assert_eq!(config.jobs.parallelism, Some(4));
        assert_eq!(config.jobs.timeout_secs, 600);
    }

    #[test]
    fn result_line_counts() {
        let summary = RunSummary {
            report: Report {
                total: 5,
                failed: 2,
                ..Report::default()
            },
            cached: 3,
            dispatched: 2,
            invalidated: false,
            rule_set_id: String::new(),
            tool_version_id: String::new(),
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(result_line(&summary), "3 passed, 2 failed out of 5 unit(s)");
    }
}
