//! Repeated test runs: flaky, failing and slow test detection.

use super::events::parse_events;
use super::failure_kind::ClassifiedFailure;
use super::report::{ReliabilityReport, ReliabilitySummary, TestSummary};
use super::test_run::RunAggregator;
use crate::config::{DEFAULT_RUNS, DEFAULT_SLOW_THRESHOLD_SECS};
use crate::errors::{AnalyzerError, Result, EXIT_FAILURE, EXIT_OK};
use crate::failures::{failures_from_runs, FailureSource, FailuresReport};
use crate::pipeline::{publish_report, IncompleteRun, Outcome, Target};
use crate::process::{CommandRunner, DartTool};
use crate::reports::{ReportHeader, ReportManager, ReportOptions, ReportStatus, ReportType};
use indicatif::{ProgressBar, ProgressStyle};

pub const TOOL_NAME: &str = "analyze_tests";

const TEMPLATE_RUNS: &str = "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] run {pos}/{len} {msg}";

#[derive(Debug, Clone)]
pub struct ReliabilityOptions {
    pub runs: usize,
    pub slow_threshold_secs: f64,
    /// Forwarded to `dart test --concurrency`; `None` runs one worker
    pub workers: Option<usize>,
    /// Also write a `failures` report when some test never passed
    pub failures_report: bool,
    pub show_progress: bool,
    pub report: ReportOptions,
}

impl Default for ReliabilityOptions {
    fn default() -> Self {
        Self {
            runs: DEFAULT_RUNS,
            slow_threshold_secs: DEFAULT_SLOW_THRESHOLD_SECS,
            workers: None,
            failures_report: true,
            show_progress: false,
            report: ReportOptions::default(),
        }
    }
}

pub struct ReliabilityAnalyzer<R: CommandRunner> {
    runner: R,
    dart: DartTool,
    target: Target,
    options: ReliabilityOptions,
}

impl<R: CommandRunner> ReliabilityAnalyzer<R> {
    pub fn new(runner: R, dart: DartTool, target: Target, options: ReliabilityOptions) -> Self {
        Self {
            runner,
            dart,
            target,
            options,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.options.show_progress || !self.options.report.enabled {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.options.runs as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE_RUNS) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar
    }

    pub fn run(&self) -> Result<Outcome> {
        if self.options.runs == 0 {
            return Err(AnalyzerError::InvalidArgument(
                "--runs must be at least 1".to_string(),
            ));
        }
        let resolved = self.target.resolve()?;
        let test_path = &resolved.paths.test_path;
        let spec = self.dart.test_json(test_path, self.options.workers);
        tracing::info!(
            module = %resolved.module_name,
            runs = self.options.runs,
            command = %spec.display(),
            "analyzing test reliability"
        );

        let mut aggregator = RunAggregator::new();
        let mut warnings = Vec::new();
        let mut incomplete = None;
        let bar = self.progress_bar();
        bar.set_message(test_path.clone());

        for run in 1..=self.options.runs {
            let output = match self.runner.run(&spec) {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(run, "test run did not complete: {}", e);
                    incomplete = Some(IncompleteRun::from_error(&spec, &e));
                    break;
                }
            };
            let parsed = parse_events(&output.stdout);
            let normal = matches!(output.code, Some(0) | Some(1));
            if !normal && parsed.results.is_empty() {
                tracing::warn!(run, code = ?output.code, "test runner failed");
                incomplete = Some(IncompleteRun::from_output(&spec, &output));
                break;
            }
            tracing::debug!(run, tests = parsed.results.len(), "run parsed");
            warnings.extend(parsed.warnings.into_iter().map(|w| format!("run {run}: {w}")));
            aggregator.add_run(parsed.results);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let runs_completed = aggregator.runs();
        let skipped = aggregator.skipped_tests();
        let tests = aggregator.into_tests();
        let slow = self.options.slow_threshold_secs;

        let manager = ReportManager::new(self.target.absolute(&self.options.report.root));
        let context = manager.start_report(&resolved.module_name, ReportType::Tests, TOOL_NAME);
        let status = if incomplete.is_some() {
            ReportStatus::Incomplete
        } else {
            ReportStatus::Complete
        };
        let never_passed = failures_from_runs(&tests);
        let report = ReliabilityReport {
            header: ReportHeader::new(&context, status),
            test_path: test_path.clone(),
            runs_requested: self.options.runs,
            runs_completed,
            slow_threshold_secs: slow,
            summary: ReliabilitySummary::from_tests(&tests, skipped, slow),
            tests: tests.iter().map(|t| TestSummary::new(t, slow)).collect(),
            failures: tests
                .iter()
                .filter(|t| t.is_flaky())
                .flat_map(|t| {
                    t.errors.iter().take(1).map(|e| {
                        ClassifiedFailure::new(&t.test_id, &t.name, t.suite.as_deref(), e)
                    })
                })
                .chain(never_passed.iter().cloned())
                .collect(),
            warnings,
            incomplete,
            checklist: self.options.report.checklist,
        };

        let mut outcome = Outcome::new(&resolved.module_name);
        outcome.exit_code = match &report.incomplete {
            Some(incomplete) => incomplete.propagated_code(),
            None if tests.iter().any(|t| t.failures() > 0) => EXIT_FAILURE,
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

        if self.options.failures_report && !never_passed.is_empty() {
            let failures_context =
                manager.start_report(&resolved.module_name, ReportType::Failures, TOOL_NAME);
            let mut failures = FailuresReport::new(
                ReportHeader::new(&failures_context, status),
                test_path.as_str(),
                FailureSource::Reliability,
                tests.len(),
                never_passed,
            );
            failures.checklist = self.options.report.checklist;
            let written = publish_report(
                &manager,
                &failures_context,
                failures.to_markdown(),
                &failures.to_json(),
                &self.options.report,
            )?;
            outcome.reports.extend(written);
        }
        Ok(outcome)
    }
}
