use crate::pipeline::IncompleteRun;
use crate::reliability::{ClassifiedFailure, FailureKind};
use crate::reports::markdown::table_cell;
use crate::reports::{ChecklistMode, ReportHeader};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Where the failures were read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum FailureSource {
    TestRun,
    Transcript(String),
    /// Consistently failing tests from a reliability run
    Reliability,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailuresReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub test_path: String,
    pub source: FailureSource,
    pub total_tests: usize,
    pub failed_tests: usize,
    pub by_kind: BTreeMap<FailureKind, usize>,
    pub failures: Vec<ClassifiedFailure>,
    pub warnings: Vec<String>,
    pub incomplete: Option<IncompleteRun>,
    #[serde(skip)]
    pub checklist: ChecklistMode,
}

impl FailuresReport {
    pub fn new(
        header: ReportHeader,
        test_path: impl Into<String>,
        source: FailureSource,
        total_tests: usize,
        failures: Vec<ClassifiedFailure>,
    ) -> Self {
        let mut by_kind = BTreeMap::new();
        for failure in &failures {
            *by_kind.entry(failure.kind).or_insert(0) += 1;
        }
        let failed_tests = failures
            .iter()
            .map(|f| f.test_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        Self {
            header,
            test_path: test_path.into(),
            source,
            total_tests,
            failed_tests,
            by_kind,
            failures,
            warnings: Vec::new(),
            incomplete: None,
            checklist: ChecklistMode::Full,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Test Failures: {}\n", self.header.module);
        let _ = writeln!(out, "{}\n", self.header.markdown_line());
        let source = match &self.source {
            FailureSource::TestRun => "single test run".to_string(),
            FailureSource::Transcript(path) => format!("transcript `{path}`"),
            FailureSource::Reliability => "repeated test runs".to_string(),
        };
        let _ = writeln!(out, "**Tests:** `{}` | **Source:** {source}\n", self.test_path);
        if let Some(incomplete) = &self.incomplete {
            let _ = writeln!(out, "{}", incomplete.to_markdown());
        }

        if self.failures.is_empty() {
            let _ = writeln!(out, "No failing tests among {} test(s).\n", self.total_tests);
        } else {
            let _ = writeln!(
                out,
                "**{} of {} test(s) failed.**\n",
                self.failed_tests, self.total_tests
            );
            out.push_str("## Failure Categories\n\n| Category | Count | Suggested fix |\n|---|---:|---|\n");
            for (kind, count) in &self.by_kind {
                let _ = writeln!(out, "| {} | {} | {} |", kind.label(), count, kind.suggestion());
            }
            out.push('\n');
        }

        if self.checklist != ChecklistMode::None && !self.failures.is_empty() {
            out.push_str("## Actionable Checklist\n\n");
            let mut seen = BTreeSet::new();
            for failure in &self.failures {
                if seen.insert(failure.test_id.as_str()) {
                    let _ = writeln!(out, "{}", failure.checklist_item());
                }
            }
            out.push('\n');
        }

        if self.checklist == ChecklistMode::Full && !self.failures.is_empty() {
            out.push_str("## Details\n\n");
            for failure in &self.failures {
                let _ = writeln!(out, "### {}\n", table_cell(&failure.name));
                let _ = writeln!(out, "```text\n{}\n```\n", failure.message);
                if !failure.stack_trace.is_empty() {
                    let _ = writeln!(
                        out,
                        "<details>\n<summary>Stack trace</summary>\n\n```text\n{}\n```\n\n</details>\n",
                        failure.stack_trace
                    );
                }
            }
        }

        if !self.warnings.is_empty() {
            out.push_str("## Parse Warnings\n\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "- {warning}");
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reliability::events::TestError;
    use crate::reports::{ReportContext, ReportStatus, ReportType};

    fn failure(test_id: &str, message: &str) -> ClassifiedFailure {
        let error = TestError {
            message: message.into(),
            stack_trace: "test/a_test.dart 3:1".into(),
            is_failure: true,
        };
        ClassifiedFailure::new(test_id, test_id, Some("test/a_test.dart"), &error)
    }

    fn header() -> ReportHeader {
        let context = ReportContext::new("a-fi", ReportType::Failures, "extract_failures");
        ReportHeader::new(&context, ReportStatus::Complete)
    }

    #[test]
    fn test_counts_tests_not_errors() {
        let report = FailuresReport::new(
            header(),
            "test/a_test.dart",
            FailureSource::TestRun,
            5,
            vec![
                failure("one", "Expected: 1"),
                failure("one", "Bad state: closed"),
                failure("two", "TimeoutException"),
            ],
        );
        assert_eq!(report.failed_tests, 2);
        assert_eq!(report.by_kind[&FailureKind::Assertion], 1);
        assert_eq!(report.by_kind[&FailureKind::StateError], 1);

        let markdown = report.to_markdown();
        assert_eq!(markdown.matches("- [ ] **one**").count(), 1);
        assert!(markdown.contains("**2 of 5 test(s) failed.**"));
        assert!(markdown.contains("## Details"));
    }

    #[test]
    fn test_source_serialization() {
        let mut report = FailuresReport::new(
            header(),
            "test",
            FailureSource::Transcript("run.jsonl".into()),
            0,
            Vec::new(),
        );
        report.checklist = ChecklistMode::None;
        let json = report.to_json();
        assert_eq!(json["source"]["kind"], "transcript");
        assert_eq!(json["source"]["path"], "run.jsonl");
        assert!(report.to_markdown().contains("No failing tests among 0 test(s)."));
    }
}
