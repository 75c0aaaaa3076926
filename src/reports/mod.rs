//! Report files: naming, paired writes, retention and lookup.

pub mod context;
pub mod filename;
pub mod manager;
pub mod markdown;

pub use context::{ReportContext, ReportHeader, ReportStatus, ReportType};
pub use filename::{ReportFile, ReportName};
pub use manager::{
    extract_json_from_report, CleanupSummary, ReportManager, WrittenReport,
    SAFETY_WINDOW_MINUTES,
};

use std::path::PathBuf;

/// How much of the actionable checklist goes into Markdown output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecklistMode {
    #[default]
    Full,
    /// One item per file or test
    Minimal,
    None,
}

/// Output settings shared by every analyzer.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub root: PathBuf,
    pub keep: usize,
    /// `--no-report`: neither print nor write
    pub enabled: bool,
    pub checklist: ChecklistMode,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(crate::config::DEFAULT_REPORT_ROOT),
            keep: crate::config::DEFAULT_KEEP,
            enabled: true,
            checklist: ChecklistMode::Full,
        }
    }
}
