//! Line coverage: collection, LCOV parsing, thresholds and reporting.

pub mod analyzer;
pub mod baseline;
pub mod checklist;
pub mod gaps;
pub mod lcov;
pub mod report;

pub use analyzer::{CoverageAnalyzer, CoverageOptions, TOOL_NAME};
pub use baseline::Baseline;
pub use gaps::{analyze_function_gaps, FunctionGap, GapPriority};
pub use report::CoverageReport;
