//! Pieces every analyzer pipeline shares: the target it analyzes, how its
//! report is published, and what it hands back to the CLI.

use crate::errors::{AnalyzerError, Result, EXIT_FAILURE, EXIT_OK};
use crate::paths::{get_qualified_module_name, PathResolver, ResolvedPaths};
use crate::process::{CommandOutput, CommandSpec};
use crate::reports::markdown::append_json_section;
use crate::reports::{ReportContext, ReportManager, ReportOptions, WrittenReport};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The path an analyzer was pointed at, plus overrides.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub input: String,
    pub test_path: Option<String>,
    pub source_path: Option<String>,
    pub module_name: Option<String>,
    pub project_root: PathBuf,
}

/// A target after path resolution.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub paths: ResolvedPaths,
    pub module_name: String,
}

impl Target {
    pub fn new(input: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.project_root)
    }

    pub fn resolve(&self) -> Result<ResolvedTarget> {
        let paths = self.resolver().resolve_paths(
            &self.input,
            self.test_path.as_deref(),
            self.source_path.as_deref(),
        )?;
        let module_name = match &self.module_name {
            Some(name) => validate_module_name(name)?,
            None => get_qualified_module_name(paths.primary()),
        };
        Ok(ResolvedTarget { paths, module_name })
    }

    /// Resolve a project-relative path against the project root.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.project_root.join(relative)
        }
    }
}

/// Module names end up in filenames that are parsed back on `_` and `@`.
pub fn validate_module_name(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(name.to_string())
    } else {
        Err(AnalyzerError::InvalidArgument(format!(
            "module name '{name}' may only contain lowercase letters, digits and '-'"
        )))
    }
}

/// What an analyzer run hands back to the CLI.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub exit_code: i32,
    pub module_name: String,
    pub reports: Vec<WrittenReport>,
}

impl Outcome {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            exit_code: EXIT_OK,
            module_name: module_name.into(),
            reports: Vec::new(),
        }
    }
}

/// Lines of stderr kept in an incomplete report
const STDERR_TAIL_LINES: usize = 20;

/// A subprocess that stopped the pipeline early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteRun {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stderr_tail: String,
}

impl IncompleteRun {
    pub fn from_output(spec: &CommandSpec, output: &CommandOutput) -> Self {
        Self {
            command: spec.display(),
            exit_code: output.code,
            stderr_tail: output.stderr_tail(STDERR_TAIL_LINES),
        }
    }

    /// For spawn failures and timeouts, where no output was captured.
    pub fn from_error(spec: &CommandSpec, error: &AnalyzerError) -> Self {
        Self {
            command: spec.display(),
            exit_code: None,
            stderr_tail: error.to_string(),
        }
    }

    /// Exit code the analyzer propagates.
    pub fn propagated_code(&self) -> i32 {
        match self.exit_code {
            Some(code) if code != EXIT_OK => code,
            _ => EXIT_FAILURE,
        }
    }

    pub fn to_markdown(&self) -> String {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        let mut out = format!(
            "> **INCOMPLETE**: `{}` failed (exit code {code}). Results below are partial.\n",
            self.command
        );
        if !self.stderr_tail.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.stderr_tail);
            out.push_str("\n```\n");
        }
        out
    }
}

/// Print the human part of a report and write the pair, unless `--no-report`.
///
/// This is the only place analyzers print their report, so `--no-report`
/// gates both outputs at once.
pub fn publish_report(
    manager: &ReportManager,
    context: &ReportContext,
    markdown: String,
    data: &Value,
    options: &ReportOptions,
) -> Result<Option<WrittenReport>> {
    if !options.enabled {
        tracing::debug!(module = %context.module_name, "report suppressed");
        return Ok(None);
    }

    println!("{markdown}");

    let mut full = markdown;
    append_json_section(&mut full, data);
    manager
        .write_report(context, &full, data, options.keep)
        .map(Some)
}
