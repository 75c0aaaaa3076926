//! Failure extraction and categorization from a single test run.

pub mod extractor;
pub mod report;

pub use extractor::{
    failures_from_results, failures_from_runs, FailureExtractor, FailureOptions, TOOL_NAME,
};
pub use report::{FailureSource, FailuresReport};
