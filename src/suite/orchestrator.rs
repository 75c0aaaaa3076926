//! Runs the coverage and reliability analyzers as child processes and
//! combines their reports into one health report.
//!
//! Each child is awaited before its report is looked up; reports are found
//! by filename through [`ReportManager::find_latest_report`] and read back
//! from the fenced JSON block of the Markdown file.

use super::health::{assess, HealthMetrics};
use super::report::{report_paths, StepResult, SuiteReport};
use crate::errors::{Result, EXIT_FAILURE, EXIT_OK};
use crate::pipeline::{publish_report, Outcome, Target};
use crate::process::{CommandRunner, CommandSpec};
use crate::reports::{
    extract_json_from_report, ChecklistMode, ReportHeader, ReportManager, ReportOptions,
    ReportStatus, ReportType,
};
use chrono::{Local, NaiveDateTime, Timelike};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const TOOL_NAME: &str = "analyze_suite";

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    /// Extra flags for the `coverage` child
    pub coverage_args: Vec<String>,
    /// Extra flags for the `tests` child
    pub tests_args: Vec<String>,
    pub verbose: u8,
    pub report: ReportOptions,
}

struct Step {
    name: &'static str,
    report_type: ReportType,
    tool_name: &'static str,
}

const STEPS: [Step; 2] = [
    Step {
        name: "coverage",
        report_type: ReportType::Coverage,
        tool_name: crate::coverage::TOOL_NAME,
    },
    Step {
        name: "tests",
        report_type: ReportType::Tests,
        tool_name: crate::reliability::TOOL_NAME,
    },
];

pub struct SuiteOrchestrator<R: CommandRunner> {
    runner: R,
    executable: PathBuf,
    target: Target,
    options: SuiteOptions,
}

fn checklist_flag(mode: ChecklistMode) -> &'static str {
    match mode {
        ChecklistMode::Full => "--checklist",
        ChecklistMode::Minimal => "--minimal-checklist",
        ChecklistMode::None => "--no-checklist",
    }
}

fn generated_at(json: &Value) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(json.get("generated_at")?.as_str()?, "%Y-%m-%dT%H:%M:%S").ok()
}

fn report_status(json: &Value) -> Option<ReportStatus> {
    serde_json::from_value(json.get("status")?.clone()).ok()
}

impl<R: CommandRunner> SuiteOrchestrator<R> {
    /// `executable` is re-invoked once per step, normally `std::env::current_exe()`.
    pub fn new(runner: R, executable: impl Into<PathBuf>, target: Target, options: SuiteOptions) -> Self {
        Self {
            runner,
            executable: executable.into(),
            target,
            options,
        }
    }

    fn child_command(&self, step: &Step, module: &str, test_path: &str, source_path: &str) -> CommandSpec {
        let report = &self.options.report;
        let mut spec = CommandSpec::new(&self.executable, &self.target.project_root)
            .arg(step.name)
            .arg(test_path)
            .args(["--test-path", test_path, "--source-path", source_path])
            .args(["--module-name", module, "--project-root", "."])
            .arg("--report-root")
            .arg(report.root.display().to_string())
            .arg("--keep")
            .arg(report.keep.to_string())
            .arg(checklist_flag(report.checklist));
        if self.options.verbose > 0 {
            spec = spec.arg(format!("-{}", "v".repeat(self.options.verbose as usize)));
        }
        let extra = match step.report_type {
            ReportType::Coverage => &self.options.coverage_args,
            _ => &self.options.tests_args,
        };
        spec.args(extra.iter().cloned())
    }

    /// Newest report of the step written since `started`.
    fn read_step_report(
        &self,
        manager: &ReportManager,
        step: &Step,
        module: &str,
        started: NaiveDateTime,
    ) -> Result<Option<(PathBuf, Value)>> {
        let Some(path) = manager.find_latest_report(module, step.report_type, Some(step.tool_name))?
        else {
            return Ok(None);
        };
        let Some(json) = extract_json_from_report(&path) else {
            tracing::warn!(path = %path.display(), "report has no readable JSON block");
            return Ok(None);
        };
        match generated_at(&json) {
            Some(at) if at >= started => Ok(Some((path, json))),
            _ => {
                tracing::debug!(path = %path.display(), "ignoring report from an earlier run");
                Ok(None)
            }
        }
    }

    pub fn run(&self) -> Result<Outcome> {
        let resolved = self.target.resolve()?;
        let module = resolved.module_name.as_str();
        let paths = &resolved.paths;
        // Report timestamps have one-second resolution
        let now = Local::now().naive_local();
        let started = now.with_nanosecond(0).unwrap_or(now);
        let manager = ReportManager::new(self.target.absolute(&self.options.report.root));

        let mut steps = Vec::with_capacity(STEPS.len());
        let mut metrics = HealthMetrics::default();
        let mut related = Vec::new();

        for step in &STEPS {
            let spec = self.child_command(step, module, &paths.test_path, &paths.source_path);
            tracing::info!(step = step.name, command = %spec.display(), "running analyzer");
            let (exit_code, stderr_tail) = match self.runner.run(&spec) {
                Ok(output) => (output.code, output.stderr_tail(STDERR_TAIL_LINES)),
                Err(e) => {
                    tracing::warn!(step = step.name, "analyzer did not complete: {}", e);
                    (None, e.to_string())
                }
            };

            // The child has exited; its report is complete on disk
            let found = self.read_step_report(&manager, step, module, started)?;
            let mut result = StepResult {
                name: step.name.to_string(),
                command: spec.display(),
                exit_code,
                report: None,
                report_status: None,
                stderr_tail,
            };
            if let Some((path, json)) = found {
                let status = report_status(&json);
                if status == Some(ReportStatus::Complete) {
                    match step.report_type {
                        ReportType::Coverage => {
                            metrics.coverage_percent = json["overall_percent"].as_f64();
                        }
                        _ => {
                            metrics.pass_rate = json["summary"]["pass_rate"].as_f64();
                            metrics.stability_percent =
                                json["summary"]["stability_percent"].as_f64();
                        }
                    }
                }
                related.push(path.display().to_string());
                result.report = Some(display_relative(&path, &self.target.project_root));
                result.report_status = status;
            }
            steps.push(result);
        }

        let incomplete = steps
            .iter()
            .any(|s| s.report_status != Some(ReportStatus::Complete));
        let status = if incomplete {
            ReportStatus::Incomplete
        } else {
            ReportStatus::Complete
        };

        let context = manager.start_report(module, ReportType::Suite, TOOL_NAME);
        let report = SuiteReport {
            header: ReportHeader::new(&context, status),
            test_path: paths.test_path.clone(),
            source_path: paths.source_path.clone(),
            health: assess(&metrics),
            steps,
            related_reports: related,
        };
        tracing::info!(score = report.health.score, status = report.health.status.label(), "suite health");

        let mut outcome = Outcome::new(module);
        outcome.exit_code = report
            .steps
            .iter()
            .find(|s| !s.succeeded())
            .map(|s| s.exit_code.unwrap_or(EXIT_FAILURE))
            .unwrap_or(EXIT_OK);

        let written = publish_report(
            &manager,
            &context,
            report.to_markdown(),
            &report.to_json(),
            &self.options.report,
        )?;
        outcome.reports.extend(written);
        tracing::debug!(reports = ?report_paths(&outcome.reports), "suite reports written");
        Ok(outcome)
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use crate::process::CommandOutput;
    use crate::reports::markdown::append_json_section;
    use crate::reports::ReportContext;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("test/auth")).unwrap();
        fs::create_dir_all(root.path().join("lib/src/auth")).unwrap();
        root
    }

    /// Stands in for a child analyzer: writes its report, then exits with `code`.
    fn child(
        root: PathBuf,
        report_type: ReportType,
        tool: &'static str,
        body: Value,
        code: i32,
    ) -> impl FnMut(&CommandSpec) -> Result<CommandOutput> {
        move |spec| {
            assert!(spec.args.contains(&"auth-fo".to_string()));
            let manager = ReportManager::new(root.join("tests_reports"));
            let context = ReportContext::new("auth-fo", report_type, tool);
            let mut data = serde_json::to_value(ReportHeader::new(&context, ReportStatus::Complete)).unwrap();
            data.as_object_mut()
                .unwrap()
                .extend(body.as_object().unwrap().clone());
            let mut markdown = String::from("# child\n");
            append_json_section(&mut markdown, &data);
            manager.write_report(&context, &markdown, &data, 1).unwrap();
            Ok(CommandOutput {
                code: Some(code),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_combines_child_reports() {
        let root = project();
        let runner = ScriptedRunner::new()
            .then(child(
                root.path().to_path_buf(),
                ReportType::Coverage,
                crate::coverage::TOOL_NAME,
                json!({"overall_percent": 80.0}),
                0,
            ))
            .then(child(
                root.path().to_path_buf(),
                ReportType::Tests,
                crate::reliability::TOOL_NAME,
                json!({"summary": {"pass_rate": 90.0, "stability_percent": 100.0}}),
                0,
            ));
        let orchestrator = SuiteOrchestrator::new(
            runner,
            "/usr/local/bin/test-analyzer",
            Target::new("test/auth", root.path()),
            SuiteOptions::default(),
        );
        let outcome = orchestrator.run().unwrap();

        assert_eq!(outcome.exit_code, EXIT_OK);
        let calls = orchestrator.runner.calls.borrow();
        assert_eq!(calls[0].args[0], "coverage");
        assert_eq!(calls[1].args[0], "tests");
        assert!(calls[0].args.contains(&"lib/src/auth".to_string()));

        let json = extract_json_from_report(&outcome.reports[0].markdown_path).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["health"]["score"], 90.0);
        assert_eq!(json["health"]["status"], "excellent");
        assert_eq!(json["health"]["coverage"]["status"], "excellent");
        assert_eq!(json["related_reports"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_child_without_report_is_incomplete() {
        let root = project();
        let runner = ScriptedRunner::new()
            .then(child(
                root.path().to_path_buf(),
                ReportType::Coverage,
                crate::coverage::TOOL_NAME,
                json!({"overall_percent": 50.0, "tests_failed": true}),
                1,
            ))
            .then_output(2, "", "error: path resolution failed");
        let orchestrator = SuiteOrchestrator::new(
            runner,
            "test-analyzer",
            Target::new("test/auth", root.path()),
            SuiteOptions::default(),
        );
        let outcome = orchestrator.run().unwrap();

        assert_eq!(outcome.exit_code, 1);
        let json = extract_json_from_report(&outcome.reports[0].markdown_path).unwrap();
        assert_eq!(json["status"], "incomplete");
        assert_eq!(json["health"]["score"], 50.0);
        assert_eq!(json["health"]["pass_rate"], Value::Null);
        assert_eq!(json["steps"][1]["report"], Value::Null);
    }

    #[test]
    fn test_child_flags() {
        let root = project();
        let options = SuiteOptions {
            tests_args: vec!["--runs".into(), "5".into()],
            verbose: 2,
            report: ReportOptions {
                checklist: ChecklistMode::Minimal,
                ..Default::default()
            },
            ..Default::default()
        };
        let orchestrator = SuiteOrchestrator::new(
            ScriptedRunner::new(),
            "test-analyzer",
            Target::new("test/auth", root.path()),
            options,
        );
        let spec = orchestrator.child_command(&STEPS[1], "auth-fo", "test/auth", "lib/src/auth");
        assert_eq!(
            spec.display(),
            "test-analyzer tests test/auth --test-path test/auth --source-path lib/src/auth \
             --module-name auth-fo --project-root . --report-root tests_reports --keep 1 \
             --minimal-checklist -vv --runs 5"
        );
    }
}
