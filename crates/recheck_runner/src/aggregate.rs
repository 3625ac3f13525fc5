//! Folding cached and fresh outcomes into one report.

use std::collections::{BTreeMap, HashSet};

use recheck_cache::{CacheEntry, CacheStore};
use serde::{Deserialize, Serialize};

use crate::exec::JobResult;
use crate::units::Unit;

/// Result recorded for a dispatched unit the executor returned nothing for.
pub const MISSING_RESULT: i32 = -1;

/// Final status of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The analysis succeeded.
    Passed,
    /// The analysis failed, errored, or timed out.
    Failed,
}

/// Final outcome of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Pass/fail status.
    pub status: Status,
    /// Raw analysis output.
    pub output: String,
}

impl From<&CacheEntry> for RunOutcome {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            status: if entry.passed() {
                Status::Passed
            } else {
                Status::Failed
            },
            output: entry.output.clone(),
        }
    }
}

/// Pass/fail summary of a run.
///
/// Passing units are only counted; details are kept for failing units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Number of units considered.
    pub total: usize,
    /// Number of failing units.
    pub failed: usize,
    /// Failing unit ids in enumeration order.
    pub failed_units: Vec<String>,
    /// Outcome of each failing unit.
    pub details: BTreeMap<String, RunOutcome>,
}

impl Report {
    /// Returns `true` if no unit failed.
    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

/// Builds the report for `units` and records fresh results in `store`.
///
/// A unit's outcome is its entry in `fresh` if it was re-analyzed, otherwise
/// its trusted entry from `cached`. Entries for units no longer enumerated
/// are dropped from the store. The caller persists the store.
pub fn aggregate(
    units: &[Unit],
    mut fresh: BTreeMap<String, JobResult>,
    cached: &BTreeMap<String, CacheEntry>,
    store: &mut CacheStore,
) -> Report {
    let mut report = Report::default();

    for unit in units {
        let entry = match (fresh.remove(&unit.id), cached.get(&unit.id)) {
            (Some(result), _) => {
                if result.timed_out() {
                    tracing::warn!("{}: analysis timed out", unit.id);
                }
                CacheEntry::from(result)
            }
            (None, Some(entry)) => entry.clone(),
            (None, None) => {
                tracing::warn!("{}: no result was produced", unit.id);
                CacheEntry::new(MISSING_RESULT, "recheck: no result was produced for this unit")
            }
        };

        report.total += 1;
        if !entry.passed() {
            report.failed += 1;
            report.failed_units.push(unit.id.clone());
            report
                .details
                .insert(unit.id.clone(), RunOutcome::from(&entry));
        }
        store.put(unit.id.clone(), entry);
    }

    let live: HashSet<&str> = units.iter().map(|u| u.id.as_str()).collect();
    store.retain(|id| live.contains(id));

    report
}
