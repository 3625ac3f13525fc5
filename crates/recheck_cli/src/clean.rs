//! `recheck clean`, which deletes the result cache so the next run analyzes
//! every unit.

use recheck_runner::Runner;

use crate::pipeline::load_project;
use crate::GlobalArgs;

/// Runs the `recheck clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (project_dir, config) = load_project(global)?;
    let runner = Runner::new(config, &project_dir)?;
    let cache_path = runner.cache_path();

    let removed = runner.clean()?;
    if !global.quiet {
        if removed {
            eprintln!("   Removed {}", cache_path.display());
        } else {
            eprintln!("   Nothing to clean");
        }
    }
    Ok(0)
}
