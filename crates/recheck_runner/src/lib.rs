//! Incremental static-analysis runner.
//!
//! Enumerates analyzable units from a compilation database, reuses cached
//! outcomes whose dependencies are unchanged, re-analyzes the rest in
//! parallel with a per-job timeout, and folds every outcome into a single
//! [`Report`].

#![warn(missing_docs)]

pub mod aggregate;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod runner;
pub mod units;

pub use aggregate::{aggregate, Report, RunOutcome, Status, MISSING_RESULT};
pub use dispatch::{normalize, DispatchSettings, Dispatcher, AMBIGUOUS_SUCCESS_RESULT};
pub use error::RunError;
pub use exec::{
    execute, shell_quote, JobExecutor, JobResult, ShellExecutor, SPAWN_FAILED_RESULT,
    TIMEOUT_MARKER, TIMEOUT_RESULT,
};
pub use runner::{Plan, RunSummary, Runner, StaleUnit};
pub use units::{enumerate_units, Unit};

pub use recheck_cache::{CacheEntry, StaleReason};
