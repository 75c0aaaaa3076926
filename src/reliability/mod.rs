//! Test reliability: repeated runs of `dart test --reporter json`.

pub mod analyzer;
pub mod events;
pub mod failure_kind;
pub mod report;
pub mod test_run;

pub use analyzer::{ReliabilityAnalyzer, ReliabilityOptions, TOOL_NAME};
pub use failure_kind::{ClassifiedFailure, FailureKind};
pub use report::{ReliabilityReport, ReliabilitySummary};
pub use test_run::{RunAggregator, TestRun};
