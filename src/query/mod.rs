//! Query specs and timed execution for job-bench.
//!
//! This module isolates timing and failure handling from the comparison
//! driver so each piece can be tested independently.

pub mod runner;
pub mod spec;

pub use runner::{TimedOutcome, TimedQueryRunner};
pub use spec::QuerySpec;
