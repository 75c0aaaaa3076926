//! Project configuration loaded from `.test-analyzer.toml`.
//!
//! Every field is optional; CLI flags override the file, and the file
//! overrides the built-in defaults.

pub mod loader;
pub mod thresholds;

pub use loader::{load_config, parse_config, CONFIG_FILE_NAME};
pub use thresholds::{CoverageThresholds, ThresholdStatus};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_RUNS: usize = 3;
pub const DEFAULT_SLOW_THRESHOLD_SECS: f64 = 1.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_REPORT_ROOT: &str = "tests_reports";
pub const DEFAULT_KEEP: usize = 1;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub coverage: CoverageConfig,

    #[serde(default)]
    pub tests: TestsConfig,

    #[serde(default)]
    pub process: ProcessConfig,

    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    pub minimum: Option<f64>,
    pub warning: Option<f64>,
    pub fail_on_decrease: Option<bool>,
    /// Baseline snapshot path, relative to the project root
    pub baseline: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestsConfig {
    pub runs: Option<usize>,
    pub slow_threshold_secs: Option<f64>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub dart_executable: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportsConfig {
    pub root: Option<PathBuf>,
    pub keep: Option<usize>,
}

impl AnalyzerConfig {
    /// Thresholds with CLI values layered over the file.
    pub fn coverage_thresholds(
        &self,
        minimum: Option<f64>,
        warning: Option<f64>,
        fail_on_decrease: bool,
    ) -> crate::errors::Result<CoverageThresholds> {
        let minimum = minimum
            .or(self.coverage.minimum)
            .unwrap_or(thresholds::DEFAULT_MINIMUM_COVERAGE);
        // An explicit warning level below the minimum is rejected; the default just follows it.
        let warning = warning
            .or(self.coverage.warning)
            .unwrap_or_else(|| thresholds::DEFAULT_WARNING_COVERAGE.max(minimum));
        let fail_on_decrease = fail_on_decrease || self.coverage.fail_on_decrease.unwrap_or(false);
        CoverageThresholds::new(minimum, warning, fail_on_decrease)
    }

    pub fn runs(&self, cli: Option<usize>) -> usize {
        cli.or(self.tests.runs).unwrap_or(DEFAULT_RUNS)
    }

    pub fn slow_threshold_secs(&self, cli: Option<f64>) -> f64 {
        cli.or(self.tests.slow_threshold_secs)
            .unwrap_or(DEFAULT_SLOW_THRESHOLD_SECS)
    }

    pub fn timeout_secs(&self, cli: Option<u64>) -> u64 {
        cli.or(self.process.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn report_root(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.reports.root.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_ROOT))
    }

    pub fn keep(&self, cli: Option<usize>) -> usize {
        cli.or(self.reports.keep).unwrap_or(DEFAULT_KEEP)
    }
}
