//! Run orchestration.
//!
//! A run goes through these steps:
//!
//! 1. Regenerate the compilation database (if configured)
//! 2. Identify the analyzer version
//! 3. Enumerate units from the compilation database
//! 4. Load the result cache and invalidate it on a rule-set or version change
//! 5. Classify every unit as cached or stale
//! 6. Dispatch the stale units
//! 7. Aggregate all outcomes into a report and save the cache

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use recheck_cache::{decide, CacheEntry, CacheStore, Decision, StaleReason};
use recheck_config::RunnerConfig;

use crate::aggregate::{aggregate, Report};
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::error::RunError;
use crate::exec::{execute, JobExecutor, ShellExecutor};
use crate::units::{enumerate_units, Unit};

/// A unit that must be analyzed again, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleUnit {
    /// The unit id.
    pub id: String,
    /// Why its cached outcome cannot be used.
    pub reason: StaleReason,
}

/// Classification of every unit before anything is dispatched.
#[derive(Debug, Clone)]
pub struct Plan {
    /// All units, in enumeration order.
    pub units: Vec<Unit>,
    /// Trusted cached outcomes, keyed by unit id.
    pub cached: BTreeMap<String, CacheEntry>,
    /// Units to re-analyze, in enumeration order.
    pub stale: Vec<StaleUnit>,
    /// Whether the whole cache was discarded because a tag changed.
    pub invalidated: bool,
    /// Active rule-set identifier.
    pub rule_set_id: String,
    /// Analyzer version identifier.
    pub tool_version_id: String,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The pass/fail report.
    pub report: Report,
    /// Number of units whose cached outcome was reused.
    pub cached: usize,
    /// Number of units that were re-analyzed.
    pub dispatched: usize,
    /// Whether the whole cache was discarded because a tag changed.
    pub invalidated: bool,
    /// Active rule-set identifier.
    pub rule_set_id: String,
    /// Analyzer version identifier.
    pub tool_version_id: String,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Drives one incremental analysis run.
pub struct Runner<E = ShellExecutor> {
    config: RunnerConfig,
    project_dir: PathBuf,
    executor: E,
}

impl Runner<ShellExecutor> {
    /// Creates a runner that executes jobs as local shell processes.
    pub fn new(config: RunnerConfig, project_dir: &Path) -> Result<Self, RunError> {
        Self::with_executor(config, project_dir, ShellExecutor::new())
    }
}

impl<E: JobExecutor> Runner<E> {
    /// Creates a runner that executes jobs on `executor`.
    ///
    /// A relative `project_dir` is anchored at the current directory, since
    /// unit ids and snapshot paths are derived from absolute paths.
    pub fn with_executor(
        config: RunnerConfig,
        project_dir: &Path,
        executor: E,
    ) -> Result<Self, RunError> {
        let project_dir = std::path::absolute(project_dir).map_err(|e| RunError::ProjectDir {
            path: project_dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            config,
            project_dir,
            executor,
        })
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Location of the result cache.
    pub fn cache_path(&self) -> PathBuf {
        self.resolve(&self.config.cache.path)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        RunnerConfig::resolve(&self.project_dir, path)
    }

    fn snapshot_dir(&self) -> PathBuf {
        self.resolve(&self.config.cache.dependency_dir)
    }

    fn work_dir(&self) -> PathBuf {
        self.resolve(&self.config.analysis.work_dir)
    }

    /// Runs the configured compilation database generator, if any.
    pub fn generate_compile_db(&self) -> Result<(), RunError> {
        let Some(command) = &self.config.compile_db.generate else {
            return Ok(());
        };
        let res = execute(
            "Building compilation database...",
            command,
            Some(&self.work_dir()),
        );
        if res.result != 0 {
            return Err(RunError::CompileDbGeneration {
                command: command.clone(),
                output: res.output,
            });
        }
        Ok(())
    }

    /// Determines the analyzer version from the configured version command.
    pub fn tool_version(&self) -> Result<String, RunError> {
        let command = &self.config.analysis.version_command;
        let res = execute(
            "Looking up analyzer version...",
            command,
            Some(&self.project_dir),
        );
        let version = res.output.trim().to_string();
        if res.result != 0 || version.is_empty() {
            return Err(RunError::ToolVersion {
                command: command.clone(),
                output: version,
            });
        }
        Ok(version)
    }

    /// Enumerates the units to analyze from the compilation database.
    pub fn enumerate(&self) -> Result<Vec<Unit>, RunError> {
        enumerate_units(
            &self.resolve(&self.config.compile_db.path),
            &self.resolve(&self.config.project.source_root),
            &self.config.units,
        )
    }

    /// Splits `units` into trusted cached outcomes and units to re-analyze.
    pub fn classify(
        &self,
        units: &[Unit],
        store: &CacheStore,
    ) -> (BTreeMap<String, CacheEntry>, Vec<StaleUnit>) {
        let snapshot_dir = self.snapshot_dir();
        let mut cached = BTreeMap::new();
        let mut stale = Vec::new();
        for unit in units {
            let snapshot = unit.snapshot_path(&snapshot_dir);
            match decide(&unit.id, &snapshot, &unit.directory, store) {
                Decision::Cached(entry) => {
                    cached.insert(unit.id.clone(), entry);
                }
                Decision::Stale(reason) => {
                    tracing::debug!("rerunning {}: {reason}", unit.id);
                    stale.push(StaleUnit {
                        id: unit.id.clone(),
                        reason,
                    });
                }
            }
        }
        (cached, stale)
    }

    /// Classifies every unit without running anything.
    ///
    /// The compilation database is used as-is; the generator is not run.
    pub fn plan(&self) -> Result<Plan, RunError> {
        let tool_version_id = self.tool_version()?;
        let (plan, _) = self.plan_with(tool_version_id)?;
        Ok(plan)
    }

    fn plan_with(&self, tool_version_id: String) -> Result<(Plan, CacheStore), RunError> {
        let rule_set_id = self.config.analysis.rule_set_id();
        let units = self.enumerate()?;

        let mut store = CacheStore::load_or_empty(&self.cache_path());
        tracing::info!("loaded previous run cache with {} entries", store.len());
        let invalidated = store.validate_tags(&rule_set_id, &tool_version_id);

        let (cached, stale) = self.classify(&units, &store);
        let plan = Plan {
            units,
            cached,
            stale,
            invalidated,
            rule_set_id,
            tool_version_id,
        };
        Ok((plan, store))
    }

    /// Performs a full run and saves the updated cache.
    pub fn run(&self) -> Result<RunSummary, RunError> {
        let start = Instant::now();

        self.generate_compile_db()?;
        let tool_version_id = self.tool_version()?;
        let (plan, mut store) = self.plan_with(tool_version_id)?;

        let stale_ids: HashSet<&str> = plan.stale.iter().map(|s| s.id.as_str()).collect();
        let stale_units: Vec<&Unit> = plan
            .units
            .iter()
            .filter(|u| stale_ids.contains(u.id.as_str()))
            .collect();

        let settings = DispatchSettings {
            work_dir: self.work_dir(),
            snapshot_dir: self.snapshot_dir(),
            analysis_command: self.config.analysis.command.clone(),
            rule_set_id: plan.rule_set_id.clone(),
            parallelism: self.config.jobs.effective_parallelism(),
            timeout: Duration::from_secs(self.config.jobs.timeout_secs),
            multiline_output_fails: self.config.analysis.multiline_output_fails,
        };
        let dispatch_start = Instant::now();
        let fresh = Dispatcher::new(&self.executor, settings).dispatch(&stale_units);
        tracing::info!(
            "analyzed {} units in {} seconds",
            stale_units.len(),
            dispatch_start.elapsed().as_secs()
        );

        let report = aggregate(&plan.units, fresh, &plan.cached, &mut store);
        store.save(&self.cache_path())?;

        Ok(RunSummary {
            report,
            cached: plan.cached.len(),
            dispatched: stale_units.len(),
            invalidated: plan.invalidated,
            rule_set_id: plan.rule_set_id,
            tool_version_id: plan.tool_version_id,
            elapsed: start.elapsed(),
        })
    }

    /// Deletes the result cache. Returns `false` if there was none.
    pub fn clean(&self) -> Result<bool, RunError> {
        Ok(CacheStore::remove(&self.cache_path())?)
    }
}
