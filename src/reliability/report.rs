//! Reliability report: pass rates, flaky and slow tests.

use super::failure_kind::ClassifiedFailure;
use super::test_run::TestRun;
use crate::pipeline::IncompleteRun;
use crate::reports::markdown::table_cell;
use crate::reports::{ChecklistMode, ReportHeader};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSummary {
    pub test_id: String,
    pub name: String,
    pub suite: Option<String>,
    pub runs: usize,
    pub passes: usize,
    pub pass_rate: f64,
    pub average_duration_ms: f64,
    pub flaky: bool,
    pub consistently_failing: bool,
    pub slow: bool,
}

impl TestSummary {
    pub fn new(run: &TestRun, slow_threshold_secs: f64) -> Self {
        Self {
            test_id: run.test_id.clone(),
            name: run.name.clone(),
            suite: run.suite.clone(),
            runs: run.results.len(),
            passes: run.passes(),
            pass_rate: run.pass_rate() * 100.0,
            average_duration_ms: run.average_duration_ms(),
            flaky: run.is_flaky(),
            consistently_failing: run.is_consistently_failing(),
            slow: run.is_slow(slow_threshold_secs),
        }
    }
}

/// Figures the suite orchestrator reads back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReliabilitySummary {
    pub total_tests: usize,
    pub skipped_tests: usize,
    pub executions: usize,
    pub passed_executions: usize,
    /// Passed executions over all executions, in percent; `None` with no executions
    pub pass_rate: Option<f64>,
    /// Share of tests that are not flaky, in percent; `None` with no tests
    pub stability_percent: Option<f64>,
    pub flaky: usize,
    pub consistently_failing: usize,
    pub slow: usize,
}

impl ReliabilitySummary {
    pub fn from_tests(tests: &[TestRun], skipped_tests: usize, slow_threshold_secs: f64) -> Self {
        let executions: usize = tests.iter().map(|t| t.results.len()).sum();
        let passed_executions: usize = tests.iter().map(TestRun::passes).sum();
        let flaky = tests.iter().filter(|t| t.is_flaky()).count();
        Self {
            total_tests: tests.len(),
            skipped_tests,
            executions,
            passed_executions,
            pass_rate: (executions > 0)
                .then(|| passed_executions as f64 / executions as f64 * 100.0),
            stability_percent: (!tests.is_empty())
                .then(|| (tests.len() - flaky) as f64 / tests.len() as f64 * 100.0),
            flaky,
            consistently_failing: tests.iter().filter(|t| t.is_consistently_failing()).count(),
            slow: tests
                .iter()
                .filter(|t| t.is_slow(slow_threshold_secs))
                .count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReliabilityReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub test_path: String,
    pub runs_requested: usize,
    pub runs_completed: usize,
    pub slow_threshold_secs: f64,
    pub summary: ReliabilitySummary,
    pub tests: Vec<TestSummary>,
    pub failures: Vec<ClassifiedFailure>,
    pub warnings: Vec<String>,
    pub incomplete: Option<IncompleteRun>,
    #[serde(skip)]
    pub checklist: ChecklistMode,
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

impl ReliabilityReport {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Test Reliability Report: {}\n", self.header.module);
        let _ = writeln!(out, "{}\n", self.header.markdown_line());
        let _ = writeln!(
            out,
            "**Tests:** `{}` | **Runs:** {} of {}\n",
            self.test_path, self.runs_completed, self.runs_requested
        );
        if let Some(incomplete) = &self.incomplete {
            let _ = writeln!(out, "{}", incomplete.to_markdown());
        }

        let s = &self.summary;
        out.push_str("## Summary\n\n| Metric | Value |\n|---|---|\n");
        let _ = writeln!(out, "| Tests | {} ({} skipped) |", s.total_tests, s.skipped_tests);
        let _ = writeln!(
            out,
            "| Executions passed | {} / {} |",
            s.passed_executions, s.executions
        );
        let _ = writeln!(out, "| Pass rate | {} |", percent(s.pass_rate));
        let _ = writeln!(out, "| Stability | {} |", percent(s.stability_percent));
        let _ = writeln!(out, "| Flaky | {} |", s.flaky);
        let _ = writeln!(out, "| Consistently failing | {} |", s.consistently_failing);
        let _ = writeln!(
            out,
            "| Slow (> {:.1}s avg) | {} |\n",
            self.slow_threshold_secs, s.slow
        );

        self.write_section(&mut out, "Consistently Failing Tests", |t| t.consistently_failing);
        self.write_section(&mut out, "Flaky Tests", |t| t.flaky);
        self.write_section(&mut out, "Slow Tests", |t| t.slow);
        self.write_checklist(&mut out);

        if !self.warnings.is_empty() {
            out.push_str("## Parse Warnings\n\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "- {warning}");
            }
            out.push('\n');
        }
        out
    }

    fn write_section(&self, out: &mut String, title: &str, include: impl Fn(&TestSummary) -> bool) {
        let tests: Vec<&TestSummary> = self.tests.iter().filter(|t| include(t)).collect();
        if tests.is_empty() {
            return;
        }
        let _ = writeln!(out, "## {title}\n");
        out.push_str("| Test | Suite | Pass rate | Avg duration |\n|---|---|---:|---:|\n");
        for test in tests {
            let _ = writeln!(
                out,
                "| {} | `{}` | {:.1}% ({}/{}) | {:.0} ms |",
                table_cell(&test.name),
                test.suite.as_deref().unwrap_or("-"),
                test.pass_rate,
                test.passes,
                test.runs,
                test.average_duration_ms
            );
        }
        out.push('\n');
    }

    fn write_checklist(&self, out: &mut String) {
        if self.checklist == ChecklistMode::None || self.failures.is_empty() {
            return;
        }
        out.push_str("## Actionable Checklist\n\n");
        let mut seen = std::collections::BTreeSet::new();
        for failure in &self.failures {
            // Minimal mode lists each test once, full mode each distinct failure
            let key = match self.checklist {
                ChecklistMode::Minimal => (failure.test_id.clone(), String::new()),
                _ => (failure.test_id.clone(), failure.headline()),
            };
            if !seen.insert(key) {
                continue;
            }
            let _ = writeln!(out, "{}", failure.checklist_item());
            if self.checklist == ChecklistMode::Full {
                let _ = writeln!(out, "  - `{}`", failure.headline().replace('`', "'"));
            }
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, outcomes: &[bool], duration_ms: u64) -> TestRun {
        let mut run = TestRun::new(name, name, Some("test/a_test.dart".into()));
        for &passed in outcomes {
            run.record(passed, duration_ms);
        }
        run
    }

    #[test]
    fn test_summary_figures() {
        let tests = vec![
            run("stable", &[true, true, true], 10),
            run("flaky", &[true, false, true], 10),
            run("broken", &[false, false, false], 2500),
        ];
        let summary = ReliabilitySummary::from_tests(&tests, 1, 1.0);

        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.executions, 9);
        assert_eq!(summary.passed_executions, 5);
        let pass_rate = summary.pass_rate.unwrap();
        assert!((pass_rate - 5.0 / 9.0 * 100.0).abs() < 1e-9);
        let stability = summary.stability_percent.unwrap();
        assert!((stability - 2.0 / 3.0 * 100.0).abs() < 1e-9);
        assert_eq!(summary.flaky, 1);
        assert_eq!(summary.consistently_failing, 1);
        assert_eq!(summary.slow, 1);
    }

    #[test]
    fn test_empty_summary_has_no_rates() {
        let summary = ReliabilitySummary::from_tests(&[], 0, 1.0);
        assert_eq!(summary.pass_rate, None);
        assert_eq!(summary.stability_percent, None);
    }
}
