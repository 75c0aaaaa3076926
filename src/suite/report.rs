use super::health::{HealthAssessment, MetricHealth};
use crate::reports::{ReportHeader, ReportStatus, WrittenReport};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// One sub-analyzer invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub name: String,
    pub command: String,
    pub exit_code: Option<i32>,
    /// Markdown report the step wrote during this suite run
    pub report: Option<String>,
    pub report_status: Option<ReportStatus>,
    pub stderr_tail: String,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub test_path: String,
    pub source_path: String,
    pub steps: Vec<StepResult>,
    pub health: HealthAssessment,
    /// Reports written by this process, in write order
    pub related_reports: Vec<String>,
}

fn metric_row(out: &mut String, name: &str, metric: Option<&MetricHealth>) {
    let _ = match metric {
        Some(m) => writeln!(
            out,
            "| {name} | {:.1}% | {} {} |",
            m.value,
            m.status.icon(),
            m.status.label()
        ),
        None => writeln!(out, "| {name} | n/a | not available |"),
    };
}

impl SuiteReport {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Test Suite Health: {}\n", self.header.module);
        let _ = writeln!(out, "{}\n", self.header.markdown_line());
        let _ = writeln!(
            out,
            "**Tests:** `{}` | **Source:** `{}`\n",
            self.test_path, self.source_path
        );
        if self.header.status == ReportStatus::Incomplete {
            out.push_str("> **INCOMPLETE**: at least one analyzer did not produce a complete report.\n\n");
        }

        let health = &self.health;
        let _ = writeln!(
            out,
            "## Health Score: {:.1} {} {}\n",
            health.score,
            health.status.icon(),
            health.status.label()
        );
        out.push_str("| Metric | Value | Status |\n|---|---:|---|\n");
        metric_row(&mut out, "Coverage", health.coverage.as_ref());
        metric_row(&mut out, "Pass rate", health.pass_rate.as_ref());
        metric_row(&mut out, "Stability", health.stability.as_ref());
        out.push('\n');

        out.push_str("## Analyzer Runs\n\n| Step | Exit code | Report |\n|---|---:|---|\n");
        for step in &self.steps {
            let code = step
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let report = step
                .report
                .as_deref()
                .map(|r| format!("`{r}`"))
                .unwrap_or_else(|| "missing".to_string());
            let _ = writeln!(out, "| {} | {} | {} |", step.name, code, report);
        }
        out.push('\n');

        for step in self.steps.iter().filter(|s| !s.stderr_tail.is_empty() && !s.succeeded()) {
            let _ = writeln!(
                out,
                "<details>\n<summary>{} stderr</summary>\n\n```text\n{}\n```\n\n</details>\n",
                step.name, step.stderr_tail
            );
        }

        if !self.related_reports.is_empty() {
            out.push_str("## Related Reports\n\n");
            for report in &self.related_reports {
                let _ = writeln!(out, "- `{report}`");
            }
            out.push('\n');
        }
        out
    }
}

/// Paths of written reports, for the related-reports section.
pub fn report_paths(reports: &[WrittenReport]) -> Vec<String> {
    reports
        .iter()
        .map(|r| r.markdown_path.display().to_string())
        .collect()
}
