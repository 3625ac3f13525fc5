//! Building and running the analysis jobs of stale units.
//!
//! Each job first regenerates the unit's dependency snapshot with the unit's
//! own compile command (`-MM -MF`) and then runs the analysis command. The
//! steps are joined with `;` so the analysis is attempted even when the
//! snapshot step fails.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::exec::{shell_quote, JobExecutor, JobResult};
use crate::units::Unit;

/// Result recorded for a job that exited 0 but printed more than one line.
pub const AMBIGUOUS_SUCCESS_RESULT: i32 = 127;

/// Everything the dispatcher needs to build and schedule jobs.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Directory analysis jobs run in.
    pub work_dir: PathBuf,
    /// Directory holding dependency snapshots.
    pub snapshot_dir: PathBuf,
    /// Analysis command template with `{file}` and `{rules}` placeholders.
    pub analysis_command: String,
    /// Rule-set identifier substituted for `{rules}`.
    pub rule_set_id: String,
    /// Maximum number of concurrent jobs.
    pub parallelism: usize,
    /// Per-job timeout.
    pub timeout: Duration,
    /// Reclassify exit-0 jobs with multi-line output as failures.
    pub multiline_output_fails: bool,
}

/// Dispatches stale units to a [`JobExecutor`].
pub struct Dispatcher<'a, E: JobExecutor + ?Sized> {
    executor: &'a E,
    settings: DispatchSettings,
}

impl<'a, E: JobExecutor + ?Sized> Dispatcher<'a, E> {
    /// Creates a dispatcher running jobs on `executor`.
    pub fn new(executor: &'a E, settings: DispatchSettings) -> Self {
        Self { executor, settings }
    }

    /// Shell command line that re-analyzes `unit`.
    pub fn job_command(&self, unit: &Unit) -> String {
        let snapshot = unit.snapshot_path(&self.settings.snapshot_dir);
        let snapshot_parent = snapshot
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.settings.snapshot_dir.clone());

        let snapshot_step = format!(
            "mkdir -p {parent} && cd {dir} && {compile} -MM -MF {snapshot}",
            parent = shell_quote(&snapshot_parent.to_string_lossy()),
            dir = shell_quote(&unit.directory.to_string_lossy()),
            compile = unit.command,
            snapshot = shell_quote(&snapshot.to_string_lossy()),
        );
        let analysis_step = self
            .settings
            .analysis_command
            .replace("{rules}", &self.settings.rule_set_id)
            .replace("{file}", &shell_quote(&unit.path.to_string_lossy()));

        format!(
            "cd {work} && ( ( {snapshot_step} ); {analysis_step} )",
            work = shell_quote(&self.settings.work_dir.to_string_lossy()),
        )
    }

    /// Runs the analysis of every unit in `stale` and returns the normalized
    /// result of each, keyed by unit id.
    pub fn dispatch(&self, stale: &[&Unit]) -> BTreeMap<String, JobResult> {
        if stale.is_empty() {
            return BTreeMap::new();
        }
        let jobs: BTreeMap<String, String> = stale
            .iter()
            .map(|unit| (unit.id.clone(), self.job_command(unit)))
            .collect();

        tracing::info!(
            "launching analysis for {} units ({} parallel, {}s timeout)",
            jobs.len(),
            self.settings.parallelism,
            self.settings.timeout.as_secs()
        );
        let raw = self
            .executor
            .run_batch(&jobs, self.settings.parallelism, self.settings.timeout);

        raw.into_iter()
            .map(|(id, result)| {
                let result = if self.settings.multiline_output_fails {
                    normalize(result)
                } else {
                    result
                };
                (id, result)
            })
            .collect()
    }
}

/// Reclassifies an exit-0 result with more than one line of output as failed.
///
/// A passing analysis prints at most a single summary line; anything more
/// means it reported problems without setting its exit status.
pub fn normalize(mut result: JobResult) -> JobResult {
    if result.result == 0 && result.output.trim().lines().count() > 1 {
        result.result = AMBIGUOUS_SUCCESS_RESULT;
    }
    result
}
