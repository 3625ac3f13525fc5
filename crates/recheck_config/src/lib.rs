//! Parsing and validation of `recheck.toml` runner configuration files.
//!
//! This crate reads the runner configuration and produces a strongly-typed
//! [`RunnerConfig`] describing where the compilation database lives, how each
//! unit is analyzed, which units are considered, and where the result cache
//! and dependency snapshots are kept.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
