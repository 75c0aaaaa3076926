//! Coverage pipeline: test run, LCOV conversion, parse, threshold gate, report.

use super::baseline::Baseline;
use super::checklist::build_checklist;
use super::gaps::analyze_function_gaps;
use super::lcov::{parse_lcov_file, LcovData};
use super::report::{CoverageReport, ThresholdSummary};
use crate::config::CoverageThresholds;
use crate::errors::{AnalyzerError, Result, EXIT_FAILURE, EXIT_OK};
use crate::paths::PathResolver;
use crate::pipeline::{publish_report, IncompleteRun, Outcome, Target};
use crate::process::dart::COVERAGE_DIR;
use crate::process::{CommandRunner, CommandSpec, DartTool};
use crate::progress::{record_sample, CoverageSample};
use crate::reports::{
    ReportHeader, ReportManager, ReportOptions, ReportStatus, ReportType, WrittenReport,
};
use std::fs;
use std::path::{Path, PathBuf};

pub const TOOL_NAME: &str = "analyze_coverage";

/// `dart test` exits 1 when some tests failed but the run itself finished.
const TESTS_FAILED_CODE: i32 = 1;

/// What the two subprocesses left behind.
struct Collected {
    data: LcovData,
    tests_failed: bool,
    incomplete: Option<IncompleteRun>,
}

#[derive(Debug, Clone, Default)]
pub struct CoverageOptions {
    pub thresholds: CoverageThresholds,
    /// Baseline snapshot, relative to the project root
    pub baseline_path: Option<PathBuf>,
    pub save_baseline: bool,
    pub report: ReportOptions,
}

pub struct CoverageAnalyzer<R: CommandRunner> {
    runner: R,
    dart: DartTool,
    target: Target,
    options: CoverageOptions,
}

impl<R: CommandRunner> CoverageAnalyzer<R> {
    pub fn new(runner: R, dart: DartTool, target: Target, options: CoverageOptions) -> Self {
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

    /// Run the whole pipeline once.
    ///
    /// Argument and path problems surface as `Err` before any process is
    /// spawned. Subprocess failures still produce a report tagged
    /// incomplete, and the outcome carries the child's exit code.
    pub fn run(&self) -> Result<Outcome> {
        let resolved = self.target.resolve()?;
        if self.options.save_baseline && self.options.baseline_path.is_none() {
            return Err(AnalyzerError::InvalidArgument(
                "--save-baseline requires a baseline path (--baseline or [coverage].baseline)"
                    .to_string(),
            ));
        }

        let paths = &resolved.paths;
        tracing::info!(
            module = %resolved.module_name,
            test_path = %paths.test_path,
            source_path = %paths.source_path,
            "analyzing coverage"
        );

        self.reset_scratch_dir()?;
        let Collected {
            data,
            tests_failed,
            incomplete,
        } = self.collect(&paths.test_path, &paths.source_path)?;
        let resolver = self.target.resolver();
        let data = relativize(data, &resolver);

        let manager = ReportManager::new(self.target.absolute(&self.options.report.root));
        let context = manager.start_report(&resolved.module_name, ReportType::Coverage, TOOL_NAME);

        let overall = data.overall_percent();
        let (thresholds, baseline_saved) = if incomplete.is_none() {
            let baseline = self.load_baseline(&resolved.module_name);
            let summary = ThresholdSummary::new(&self.options.thresholds, baseline, overall);
            let saved = self.save_baseline(&resolved.module_name, &data)?;
            (Some(summary), saved)
        } else {
            (None, false)
        };

        let status = if incomplete.is_some() {
            ReportStatus::Incomplete
        } else {
            ReportStatus::Complete
        };
        let report = CoverageReport {
            header: ReportHeader::new(&context, status),
            test_path: paths.test_path.clone(),
            source_path: paths.source_path.clone(),
            overall_percent: overall,
            total_lines: data.total_lines(),
            hit_lines: data.hit_lines(),
            checklist: build_checklist(data.files.values(), self.options.report.checklist),
            function_gaps: analyze_function_gaps(data.files.values(), &self.target.project_root),
            files: data.files.into_values().collect(),
            branches: data.branches,
            tests_failed,
            thresholds,
            baseline_saved,
            warnings: data.warnings,
            incomplete,
        };

        let mut outcome = Outcome::new(&resolved.module_name);
        outcome.exit_code = exit_code(&report);
        let written = publish_report(
            &manager,
            &context,
            report.to_markdown(),
            &report.to_json(),
            &self.options.report,
        )?;
        if let Some(written) = &written {
            if report.incomplete.is_none() {
                record_history(manager.root(), written, overall);
            }
        }
        outcome.reports.extend(written);
        Ok(outcome)
    }

    fn reset_scratch_dir(&self) -> Result<()> {
        let dir = self.dart.project_root().join(COVERAGE_DIR);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AnalyzerError::file_system(dir, e)),
        }
    }

    /// Run both subprocesses and parse whatever LCOV they produced.
    ///
    /// Failing tests still produce a measurement; any other non-zero exit
    /// makes the run incomplete.
    fn collect(&self, test_path: &str, source_path: &str) -> Result<Collected> {
        let test_run = self.dart.test_with_coverage(test_path, COVERAGE_DIR);
        let mut tests_failed = false;
        let incomplete = match self.run_step(&test_run) {
            Ok(None) => None,
            Ok(Some(failed)) if failed.exit_code == Some(TESTS_FAILED_CODE) => {
                tracing::info!("some tests failed; coverage is still measured");
                tests_failed = true;
                None
            }
            Ok(Some(failed)) => Some(failed),
            // Nothing was collected if the test runner never ran
            Err(failed) => {
                return Ok(Collected {
                    data: LcovData::new(),
                    tests_failed,
                    incomplete: Some(failed),
                })
            }
        };

        let format = self.dart.format_coverage(COVERAGE_DIR, source_path);
        match self.run_step(&format) {
            Ok(None) => {}
            Ok(Some(failed)) | Err(failed) => {
                return Ok(Collected {
                    data: LcovData::new(),
                    tests_failed,
                    incomplete: incomplete.or(Some(failed)),
                });
            }
        }

        let lcov_path = self.dart.lcov_path(COVERAGE_DIR);
        let data = match parse_lcov_file(&lcov_path) {
            Ok(data) => data,
            Err(e) if incomplete.is_some() => {
                tracing::debug!("No LCOV after failed test run: {}", e);
                LcovData::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Collected {
            data,
            tests_failed,
            incomplete,
        })
    }

    /// `Ok(None)` on success, `Ok(Some)` on a non-zero exit, `Err` when the
    /// child could not be run to completion.
    fn run_step(&self, spec: &CommandSpec) -> std::result::Result<Option<IncompleteRun>, IncompleteRun> {
        tracing::debug!(command = %spec.display(), "running");
        match self.runner.run(spec) {
            Ok(output) if output.success() => Ok(None),
            Ok(output) => {
                tracing::warn!(command = %spec.display(), code = ?output.code, "command failed");
                Ok(Some(IncompleteRun::from_output(spec, &output)))
            }
            Err(e) => {
                tracing::warn!(command = %spec.display(), "command did not complete: {}", e);
                Err(IncompleteRun::from_error(spec, &e))
            }
        }
    }

    /// The saved percentage, if the snapshot belongs to `module`.
    fn load_baseline(&self, module: &str) -> Option<f64> {
        let path = self.target.absolute(self.options.baseline_path.as_ref()?);
        match Baseline::load(&path) {
            Ok(Some(baseline)) if baseline.module != module => {
                tracing::warn!(
                    path = %path.display(),
                    baseline_module = %baseline.module,
                    module,
                    "Ignoring baseline saved for another module"
                );
                None
            }
            Ok(baseline) => baseline.map(|b| b.coverage_percent),
            Err(e) => {
                tracing::warn!("Ignoring unreadable baseline: {}", e);
                None
            }
        }
    }

    /// Saved even when the run violates a threshold; the violation is still reported.
    fn save_baseline(&self, module: &str, data: &LcovData) -> Result<bool> {
        let Some(relative) = self.options.baseline_path.as_ref().filter(|_| self.options.save_baseline)
        else {
            return Ok(false);
        };
        let path = self.target.absolute(relative);
        Baseline {
            module: module.to_string(),
            coverage_percent: data.overall_percent(),
            total_lines: data.total_lines(),
            hit_lines: data.hit_lines(),
            saved_at: chrono::Local::now(),
        }
        .save(&path)?;
        tracing::info!(path = %path.display(), "baseline saved");
        Ok(true)
    }
}

/// History outlives report retention; a failed append only costs a trend point.
fn record_history(report_root: &Path, written: &WrittenReport, percent: f64) {
    let context = &written.context;
    let sample = CoverageSample {
        generated_at: context.timestamp,
        percent,
        tool: context.tool_name.clone(),
        report_id: context.report_id.clone(),
        report: written.markdown_path.clone(),
    };
    if let Err(e) = record_sample(report_root, &context.module_name, &sample) {
        tracing::warn!("Coverage history not updated: {}", e);
    }
}

/// `format_coverage` may report absolute paths; keys are made project-relative.
fn relativize(data: LcovData, resolver: &PathResolver) -> LcovData {
    let LcovData {
        files,
        branches,
        warnings,
    } = data;
    let files = files
        .into_values()
        .map(|mut file| {
            file.path = resolver.relativize(&file.path);
            (file.path.clone(), file)
        })
        .collect();
    LcovData {
        files,
        branches,
        warnings,
    }
}

fn exit_code(report: &CoverageReport) -> i32 {
    if let Some(incomplete) = &report.incomplete {
        return incomplete.propagated_code();
    }
    match &report.thresholds {
        Some(t) if t.violation => EXIT_FAILURE,
        _ if report.tests_failed => EXIT_FAILURE,
        _ => EXIT_OK,
    }
}
