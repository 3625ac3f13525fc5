//! `recheck status`, a dry run that shows which units would be analyzed.
//!
//! Uses the existing compilation database and result cache without running
//! the database generator or any analysis job, and writes nothing.

use recheck_runner::{Plan, Runner};

use crate::pipeline::load_project;
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `recheck status` command. Always returns exit code 0.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (project_dir, config) = load_project(global)?;
    let runner = Runner::new(config, &project_dir)?;
    let plan = runner.plan()?;

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                eprint!("{}", render_plan(&plan));
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
        }
    }
    Ok(0)
}

fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    if plan.invalidated {
        out.push_str("   Cached results will be discarded (rule set or analyzer version changed)\n");
    }
    for stale in &plan.stale {
        out.push_str(&format!("   STALE {}: {}\n", stale.id, stale.reason));
    }
    out.push_str(&format!(
        "   Result: {} cached, {} to analyze out of {} unit(s)\n",
        plan.cached.len(),
        plan.stale.len(),
        plan.units.len()
    ));
    out
}

fn plan_json(plan: &Plan) -> serde_json::Value {
    let stale: Vec<_> = plan
        .stale
        .iter()
        .map(|s| serde_json::json!({ "unit": s.id, "reason": s.reason.to_string() }))
        .collect();
    serde_json::json!({
        "total": plan.units.len(),
        "cached": plan.cached.len(),
        "stale": stale,
        "invalidated": plan.invalidated,
        "ruleSetId": plan.rule_set_id,
        "toolVersionId": plan.tool_version_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recheck_runner::{CacheEntry, StaleReason, StaleUnit, Unit};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn unit(id: &str) -> Unit {
        Unit {
            id: id.to_string(),
            path: PathBuf::from("/p").join(id),
            command: "c++".to_string(),
            directory: PathBuf::from("/p"),
        }
    }

    fn plan() -> Plan {
        let a = unit("src/a.cc");
        let b = unit("src/b.cc");
        let mut cached = BTreeMap::new();
        cached.insert("src/a.cc".to_string(), CacheEntry::new(0, "ok"));
        Plan {
            units: vec![a, b],
            cached,
            stale: vec![StaleUnit {
                id: "src/b.cc".to_string(),
                reason: StaleReason::MissingSnapshot,
            }],
            invalidated: false,
            rule_set_id: "bugprone-*".to_string(),
            tool_version_id: "tidy 17".to_string(),
        }
    }

    #[test]
    fn text_lists_stale_units_with_reasons() {
        let text = render_plan(&plan());
        assert_eq!(
            text,
            "   STALE src/b.cc: has no dependency file\n   \
             Result: 1 cached, 1 to analyze out of 2 unit(s)\n"
        );
    }

    #[test]
    fn text_mentions_invalidation() {
        let mut plan = plan();
        plan.invalidated = true;
        assert!(render_plan(&plan).starts_with("   Cached results will be discarded"));
    }

    #[test]
    fn json_shape() {
        let json = plan_json(&plan());
        assert_eq!(json["total"], 2);
        assert_eq!(json["cached"], 1);
        assert_eq!(json["stale"][0]["unit"], "src/b.cc");
        assert_eq!(json["stale"][0]["reason"], "has no dependency file");
        assert_eq!(json["toolVersionId"], "tidy 17");
    }
}
