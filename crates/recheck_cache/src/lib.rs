//! Persistent analysis result cache and staleness detection.
//!
//! This crate records the last outcome of every analyzed unit together with
//! the rule-set and tool-version tags it was produced under, reads the
//! compiler-generated dependency snapshot of each unit, and decides whether a
//! cached outcome can be trusted or the unit must be analyzed again.

#![warn(missing_docs)]

pub mod error;
pub mod snapshot;
pub mod staleness;
pub mod store;

pub use error::CacheError;
pub use snapshot::{read_snapshot, DependencySnapshot};
pub use staleness::{decide, Decision, StaleReason};
pub use store::{CacheEntry, CacheStore};
