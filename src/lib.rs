//! Coverage, reliability and failure analysis for Dart test suites.
//!
//! Each analyzer resolves a test/source path pair, drives `dart` as a child
//! process, and writes a Markdown + JSON report pair under `tests_reports/`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod errors;
pub mod failures;
pub mod observability;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod reliability;
pub mod reports;
pub mod suite;
pub mod watch;

pub use crate::errors::{AnalyzerError, Result};
pub use crate::paths::{get_qualified_module_name, PathResolver, ResolvedPaths};
pub use crate::pipeline::{Outcome, Target};
pub use crate::reports::{ReportContext, ReportManager, ReportType};
