//! Single-run failure extraction.

use super::report::{FailureSource, FailuresReport};
use crate::errors::{AnalyzerError, Result, EXIT_FAILURE, EXIT_OK};
use crate::pipeline::{publish_report, IncompleteRun, Outcome, Target};
use crate::process::{CommandRunner, DartTool};
use crate::reliability::events::{parse_events, ParsedRun, TestError, TestOutcome, TestResult};
use crate::reliability::{ClassifiedFailure, TestRun};
use crate::reports::{ReportHeader, ReportManager, ReportOptions, ReportStatus, ReportType};
use std::fs;
use std::path::PathBuf;

pub const TOOL_NAME: &str = "extract_failures";

#[derive(Debug, Clone, Default)]
pub struct FailureOptions {
    /// Saved `dart test --reporter json` output to read instead of running tests
    pub input: Option<PathBuf>,
    pub workers: Option<usize>,
    pub report: ReportOptions,
}

fn missing_error() -> TestError {
    TestError {
        message: "test failed without reporting an error".to_string(),
        stack_trace: String::new(),
        is_failure: true,
    }
}

/// Every failed result, one entry per reported error.
pub fn failures_from_results(results: &[TestResult]) -> Vec<ClassifiedFailure> {
    results
        .iter()
        .filter(|r| r.outcome == TestOutcome::Failed)
        .flat_map(|r| {
            let errors = if r.errors.is_empty() {
                vec![missing_error()]
            } else {
                r.errors.clone()
            };
            errors
                .into_iter()
                .map(|e| ClassifiedFailure::new(&r.key, &r.name, r.suite.as_deref(), &e))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Failures of tests that never passed across repeated runs.
pub fn failures_from_runs(tests: &[TestRun]) -> Vec<ClassifiedFailure> {
    tests
        .iter()
        .filter(|t| t.is_consistently_failing())
        .flat_map(|t| {
            let fallback = missing_error();
            // Identical errors repeat once per run
            let mut errors: Vec<&TestError> = Vec::new();
            for error in &t.errors {
                if !errors.iter().any(|e| e.message == error.message) {
                    errors.push(error);
                }
            }
            if errors.is_empty() {
                errors.push(&fallback);
            }
            let classified: Vec<ClassifiedFailure> = errors
                .into_iter()
                .map(|e| ClassifiedFailure::new(&t.test_id, &t.name, t.suite.as_deref(), e))
                .collect();
            classified
        })
        .collect()
}

pub struct FailureExtractor<R: CommandRunner> {
    runner: R,
    dart: DartTool,
    target: Target,
    options: FailureOptions,
}

impl<R: CommandRunner> FailureExtractor<R> {
    pub fn new(runner: R, dart: DartTool, target: Target, options: FailureOptions) -> Self {
        Self {
            runner,
            dart,
            target,
            options,
        }
    }

    pub fn run(&self) -> Result<Outcome> {
        let resolved = self.target.resolve()?;
        let test_path = &resolved.paths.test_path;

        let (parsed, source, incomplete) = match &self.options.input {
            Some(input) => {
                let path = self.target.absolute(input);
                let contents =
                    fs::read_to_string(&path).map_err(|e| AnalyzerError::file_system(&path, e))?;
                (
                    parse_events(&contents),
                    FailureSource::Transcript(input.display().to_string()),
                    None,
                )
            }
            None => {
                let (parsed, incomplete) = self.run_tests(test_path);
                (parsed, FailureSource::TestRun, incomplete)
            }
        };

        let failures = failures_from_results(&parsed.results);
        tracing::info!(
            module = %resolved.module_name,
            failures = failures.len(),
            "extracted failures"
        );

        let manager = ReportManager::new(self.target.absolute(&self.options.report.root));
        let context = manager.start_report(&resolved.module_name, ReportType::Failures, TOOL_NAME);
        let status = if incomplete.is_some() {
            ReportStatus::Incomplete
        } else {
            ReportStatus::Complete
        };
        let total_tests = parsed
            .results
            .iter()
            .filter(|r| r.outcome != TestOutcome::Skipped)
            .count();
        let mut report = FailuresReport::new(
            ReportHeader::new(&context, status),
            test_path.as_str(),
            source,
            total_tests,
            failures,
        );
        report.warnings = parsed.warnings;
        report.checklist = self.options.report.checklist;
        report.incomplete = incomplete;

        let mut outcome = Outcome::new(&resolved.module_name);
        outcome.exit_code = match &report.incomplete {
            Some(incomplete) => incomplete.propagated_code(),
            None if report.failed_tests > 0 => EXIT_FAILURE,
            None => EXIT_OK,
        };
        let written = publish_report(
            &manager,
            &context,
            report.to_markdown(),
            &report.to_json(),
            &self.options.report,
        )?;
        outcome.reports.extend(written);
        Ok(outcome)
    }

    /// Exit codes 0 and 1 are normal for the JSON reporter.
    fn run_tests(&self, test_path: &str) -> (ParsedRun, Option<IncompleteRun>) {
        let spec = self.dart.test_json(test_path, self.options.workers);
        match self.runner.run(&spec) {
            Ok(output) => {
                let parsed = parse_events(&output.stdout);
                let normal = matches!(output.code, Some(0) | Some(1));
                if !normal && parsed.results.is_empty() {
                    (parsed, Some(IncompleteRun::from_output(&spec, &output)))
                } else {
                    (parsed, None)
                }
            }
            Err(e) => {
                tracing::warn!("Test run did not complete: {}", e);
                (ParsedRun::default(), Some(IncompleteRun::from_error(&spec, &e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use crate::reports::extract_json_from_report;
    use indoc::indoc;
    use tempfile::TempDir;

    const FAILING: &str = indoc! {r#"
        {"suite":{"id":0,"platform":"vm","path":"test/cart/cart_test.dart"},"type":"suite","time":0}
        {"test":{"id":1,"name":"adds item","suiteID":0},"type":"testStart","time":1}
        {"testID":1,"result":"success","skipped":false,"hidden":false,"type":"testDone","time":5}
        {"test":{"id":2,"name":"removes item","suiteID":0},"type":"testStart","time":6}
        {"testID":2,"error":"Null check operator used on a null value","stackTrace":"lib/cart.dart 10:3","isFailure":false,"type":"error","time":7}
        {"testID":2,"result":"error","skipped":false,"hidden":false,"type":"testDone","time":8}
        {"success":false,"type":"done","time":9}
    "#};

    fn project() -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("test/cart")).unwrap();
        fs::create_dir_all(root.path().join("lib/cart")).unwrap();
        root
    }

    #[test]
    fn test_failing_run_exits_one_with_one_item_per_test() {
        let root = project();
        let extractor = FailureExtractor::new(
            ScriptedRunner::new().then_output(1, FAILING, ""),
            DartTool::new("dart", root.path()),
            Target::new("test/cart", root.path()),
            FailureOptions::default(),
        );
        let outcome = extractor.run().unwrap();

        assert_eq!(outcome.exit_code, EXIT_FAILURE);
        let path = &outcome.reports[0].markdown_path;
        assert!(path.starts_with(root.path().join("tests_reports/failures")));
        let markdown = fs::read_to_string(path).unwrap();
        assert!(markdown.contains("- [ ] **removes item** (`test/cart/cart_test.dart`): null error."));
        let json = extract_json_from_report(path).unwrap();
        assert_eq!(json["failed_tests"], 1);
        assert_eq!(json["total_tests"], 2);
        assert_eq!(json["by_kind"]["null_error"], 1);
    }

    #[test]
    fn test_reads_transcript_instead_of_running() {
        let root = project();
        fs::write(root.path().join("run.jsonl"), FAILING.replace(r#""result":"error""#, r#""result":"success""#)).unwrap();
        let extractor = FailureExtractor::new(
            ScriptedRunner::new(),
            DartTool::new("dart", root.path()),
            Target::new("test/cart", root.path()),
            FailureOptions {
                input: Some(PathBuf::from("run.jsonl")),
                ..Default::default()
            },
        );
        let outcome = extractor.run().unwrap();
        // The error event still marks the test failed even though the result says success
        assert_eq!(outcome.exit_code, EXIT_FAILURE);
        assert!(extractor.runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_crashed_runner_is_incomplete() {
        let root = project();
        let extractor = FailureExtractor::new(
            ScriptedRunner::new().then_output(255, "", "Could not find an option named \"reporter\""),
            DartTool::new("dart", root.path()),
            Target::new("test/cart", root.path()),
            FailureOptions::default(),
        );
        let outcome = extractor.run().unwrap();
        assert_eq!(outcome.exit_code, 255);
        let json = extract_json_from_report(&outcome.reports[0].markdown_path).unwrap();
        assert_eq!(json["status"], "incomplete");
    }

    #[test]
    fn test_runs_failures_are_deduplicated() {
        let mut run = TestRun::new("k", "broken", None);
        for _ in 0..3 {
            run.record(false, 1);
            run.errors.push(TestError {
                message: "Expected: 1".into(),
                stack_trace: String::new(),
                is_failure: true,
            });
        }
        let flaky = {
            let mut t = TestRun::new("f", "flaky", None);
            t.record(true, 1);
            t.record(false, 1);
            t
        };
        let failures = failures_from_runs(&[run, flaky]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "broken");
    }
}
