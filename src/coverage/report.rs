//! Coverage report payload and its Markdown rendering.

use super::checklist::ChecklistItem;
use super::gaps::FunctionGap;
use super::lcov::{BranchCoverage, FileCoverage, ParseWarning};
use crate::config::{CoverageThresholds, ThresholdStatus};
use crate::pipeline::IncompleteRun;
use crate::reports::markdown::{format_range, line_ranges, table_cell};
use crate::reports::ReportHeader;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdSummary {
    pub minimum: f64,
    pub warning: f64,
    pub fail_on_decrease: bool,
    pub baseline: Option<f64>,
    pub result: ThresholdStatus,
    pub violation: bool,
}

impl ThresholdSummary {
    pub fn new(thresholds: &CoverageThresholds, baseline: Option<f64>, current: f64) -> Self {
        let result = thresholds.evaluate(current, baseline);
        Self {
            minimum: thresholds.minimum(),
            warning: thresholds.warning(),
            fail_on_decrease: thresholds.fail_on_decrease(),
            baseline,
            result,
            violation: result.is_violation(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub test_path: String,
    pub source_path: String,
    pub overall_percent: f64,
    pub total_lines: usize,
    pub hit_lines: usize,
    pub files: Vec<FileCoverage>,
    pub branches: Option<BranchCoverage>,
    /// The test run exited 1; coverage covers the tests that did run
    pub tests_failed: bool,
    /// Uncovered lines grouped by enclosing function, highest priority first
    pub function_gaps: Vec<FunctionGap>,
    /// `None` when the pipeline stopped before coverage could be measured
    pub thresholds: Option<ThresholdSummary>,
    pub baseline_saved: bool,
    pub checklist: Vec<ChecklistItem>,
    pub warnings: Vec<ParseWarning>,
    pub incomplete: Option<IncompleteRun>,
}

fn status_icon(status: ThresholdStatus) -> &'static str {
    match status {
        ThresholdStatus::Passed => "✅",
        ThresholdStatus::Warning => "⚠️",
        ThresholdStatus::BelowMinimum | ThresholdStatus::Decreased { .. } => "❌",
    }
}

impl CoverageReport {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Coverage Report: {}\n", self.header.module);
        let _ = writeln!(out, "{}\n", self.header.markdown_line());
        let _ = writeln!(
            out,
            "**Tests:** `{}` | **Source:** `{}`\n",
            self.test_path, self.source_path
        );
        if let Some(incomplete) = &self.incomplete {
            let _ = writeln!(out, "{}", incomplete.to_markdown());
        }
        if self.tests_failed {
            out.push_str(
                "> **TESTS FAILED**: the test run exited with code 1. Coverage reflects the tests that ran.\n\n",
            );
        }

        self.write_summary(&mut out);
        self.write_files(&mut out);
        self.write_uncovered(&mut out);
        self.write_function_gaps(&mut out);

        if !self.checklist.is_empty() {
            out.push_str("## Actionable Checklist\n\n");
            for item in &self.checklist {
                let _ = writeln!(out, "{}", item.to_markdown());
            }
            out.push('\n');
        }

        if !self.warnings.is_empty() {
            out.push_str("## Parse Warnings\n\n");
            for warning in &self.warnings {
                let file = warning.file.as_deref().unwrap_or("-");
                let _ = writeln!(
                    out,
                    "- line {} (`{}`): {}",
                    warning.line, file, warning.message
                );
            }
            out.push('\n');
        }
        out
    }

    fn write_summary(&self, out: &mut String) {
        out.push_str("## Summary\n\n| Metric | Value |\n|---|---|\n");
        let _ = writeln!(out, "| Overall coverage | {:.2}% |", self.overall_percent);
        let _ = writeln!(out, "| Lines hit | {} / {} |", self.hit_lines, self.total_lines);
        let _ = writeln!(out, "| Files | {} |", self.files.len());
        if let Some(branches) = &self.branches {
            let _ = writeln!(
                out,
                "| Branches hit | {} / {} ({:.2}%) |",
                branches.hit,
                branches.found,
                branches.percent()
            );
        }
        if let Some(thresholds) = &self.thresholds {
            let _ = writeln!(out, "| Minimum | {:.1}% |", thresholds.minimum);
            let _ = writeln!(out, "| Warning | {:.1}% |", thresholds.warning);
            if let Some(baseline) = thresholds.baseline {
                let _ = writeln!(out, "| Baseline | {baseline:.2}% |");
            }
            let _ = writeln!(
                out,
                "| Status | {} {} |",
                status_icon(thresholds.result),
                thresholds.result.label()
            );
        }
        if self.baseline_saved {
            out.push_str("| Baseline | saved from this run |\n");
        }
        out.push('\n');

        if let Some(thresholds) = self.thresholds.as_ref().filter(|t| t.violation) {
            let _ = match thresholds.result {
                ThresholdStatus::Decreased { baseline } => writeln!(
                    out,
                    "> **THRESHOLD VIOLATION**: coverage {:.2}% dropped below the baseline {:.2}%.\n",
                    self.overall_percent, baseline
                ),
                _ => writeln!(
                    out,
                    "> **THRESHOLD VIOLATION**: coverage {:.2}% is below the minimum {:.1}%.\n",
                    self.overall_percent, thresholds.minimum
                ),
            };
        }
    }

    fn write_files(&self, out: &mut String) {
        if self.files.is_empty() {
            return;
        }
        out.push_str("## Files\n\n| File | Coverage | Lines | Uncovered |\n|---|---:|---:|---:|\n");
        for file in &self.files {
            let _ = writeln!(
                out,
                "| `{}` | {:.2}% | {} / {} | {} |",
                table_cell(&file.path),
                file.percent(),
                file.hit_lines,
                file.total_lines,
                file.uncovered_lines.len()
            );
        }
        out.push('\n');
    }

    fn write_uncovered(&self, out: &mut String) {
        let gaps: Vec<&FileCoverage> = self
            .files
            .iter()
            .filter(|f| !f.uncovered_lines.is_empty())
            .collect();
        if gaps.is_empty() {
            return;
        }
        out.push_str("## Uncovered Lines\n\n");
        for file in gaps {
            let lines: Vec<u32> = file.uncovered_lines.iter().copied().collect();
            let ranges: Vec<String> = line_ranges(&lines).into_iter().map(format_range).collect();
            let _ = writeln!(out, "- `{}`: {}", file.path, ranges.join(", "));
        }
        out.push('\n');
    }

    fn write_function_gaps(&self, out: &mut String) {
        if self.function_gaps.is_empty() {
            return;
        }
        out.push_str("## Uncovered Functions\n\n| Priority | Function | File | Line | Uncovered lines |\n|---|---|---|---:|---:|\n");
        for gap in &self.function_gaps {
            let _ = writeln!(
                out,
                "| {} | `{}()` | `{}` | {} | {} |",
                gap.priority,
                table_cell(&gap.function),
                table_cell(&gap.file),
                gap.line,
                gap.uncovered_lines
            );
        }
        out.push('\n');
    }
}
