use crate::config::AnalyzerConfig;
use crate::pipeline::Target;
use crate::progress::DEFAULT_TARGET_PERCENT;
use crate::reports::{ChecklistMode, ReportOptions, ReportType};
use crate::watch::DEFAULT_POLL_INTERVAL_SECS;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "test-analyzer")]
#[command(about = "Coverage, reliability and failure analysis for Dart test suites", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// What to analyze and where the project lives.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Test-side or source-side path; the other side is inferred
    pub path: String,

    /// Explicit test path, skips inference
    #[arg(long = "test-path")]
    pub test_path: Option<String>,

    /// Explicit source path, skips inference
    #[arg(long = "source-path")]
    pub source_path: Option<String>,

    /// Override the computed qualified module name
    #[arg(long = "module-name")]
    pub module_name: Option<String>,

    /// Dart project root (the directory holding pubspec.yaml)
    #[arg(long = "project-root", default_value = ".")]
    pub project_root: PathBuf,

    /// Kill a child process after this many seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,
}

impl TargetArgs {
    pub fn target(&self) -> Target {
        Target {
            input: self.path.clone(),
            test_path: self.test_path.clone(),
            source_path: self.source_path.clone(),
            module_name: self.module_name.clone(),
            project_root: self.project_root.clone(),
        }
    }
}

/// Where and how reports are written.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Neither print nor write the report
    #[arg(long = "no-report")]
    pub no_report: bool,

    /// Report directory, relative to the project root
    #[arg(long = "report-root")]
    pub report_root: Option<PathBuf>,

    /// Report pairs to keep per module and tool
    #[arg(long = "keep")]
    pub keep: Option<usize>,

    /// Include the full actionable checklist (default)
    #[arg(long = "checklist", conflicts_with_all = ["no_checklist", "minimal_checklist"])]
    pub checklist: bool,

    /// Leave the checklist out
    #[arg(long = "no-checklist", conflicts_with = "minimal_checklist")]
    pub no_checklist: bool,

    /// One checklist item per file or test
    #[arg(long = "minimal-checklist")]
    pub minimal_checklist: bool,
}

impl OutputArgs {
    pub fn checklist_mode(&self) -> ChecklistMode {
        if self.no_checklist {
            ChecklistMode::None
        } else if self.minimal_checklist {
            ChecklistMode::Minimal
        } else {
            ChecklistMode::Full
        }
    }

    pub fn report_options(&self, config: &AnalyzerConfig) -> ReportOptions {
        ReportOptions {
            root: config.report_root(self.report_root.clone()),
            keep: config.keep(self.keep),
            enabled: !self.no_report,
            checklist: self.checklist_mode(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Re-run whenever files under the test or source path change
    #[arg(long = "watch")]
    pub watch: bool,

    /// Seconds between change checks in watch mode
    #[arg(long = "poll-interval", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ThresholdArgs {
    /// Fail when overall coverage is below this percentage
    #[arg(long = "min-coverage")]
    pub min_coverage: Option<f64>,

    /// Warn when overall coverage is below this percentage
    #[arg(long = "warn-coverage")]
    pub warn_coverage: Option<f64>,

    /// Fail when coverage dropped below the baseline
    #[arg(long = "fail-on-decrease")]
    pub fail_on_decrease: bool,

    /// Baseline snapshot file, relative to the project root
    #[arg(long = "baseline")]
    pub baseline: Option<PathBuf>,
}

impl ThresholdArgs {
    /// The same flags, rendered for a child invocation.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(minimum) = self.min_coverage {
            args.extend(["--min-coverage".to_string(), minimum.to_string()]);
        }
        if let Some(warning) = self.warn_coverage {
            args.extend(["--warn-coverage".to_string(), warning.to_string()]);
        }
        if self.fail_on_decrease {
            args.push("--fail-on-decrease".to_string());
        }
        if let Some(baseline) = &self.baseline {
            args.extend(["--baseline".to_string(), baseline.display().to_string()]);
        }
        args
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of times to run the suite
    #[arg(long = "runs")]
    pub runs: Option<usize>,

    /// Seconds after which a test counts as slow
    #[arg(long = "slow")]
    pub slow: Option<f64>,

    #[command(flatten)]
    pub workers: WorkerArgs,
}

impl RunArgs {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(runs) = self.runs {
            args.extend(["--runs".to_string(), runs.to_string()]);
        }
        if let Some(slow) = self.slow {
            args.extend(["--slow".to_string(), slow.to_string()]);
        }
        if self.workers.parallel {
            args.push("--parallel".to_string());
        }
        if let Some(workers) = self.workers.workers {
            args.extend(["--workers".to_string(), workers.to_string()]);
        }
        args
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct WorkerArgs {
    /// Let the test runner use several workers
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Worker count for the test runner (implies --parallel)
    #[arg(long = "workers")]
    pub workers: Option<usize>,
}

impl WorkerArgs {
    /// `None` means a single worker.
    pub fn resolve(&self, config: &AnalyzerConfig) -> Option<usize> {
        if self.workers.is_some() {
            return self.workers;
        }
        if self.parallel {
            return config.tests.workers.or_else(|| {
                std::thread::available_parallelism()
                    .ok()
                    .map(|n| n.get())
            });
        }
        config.tests.workers
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run tests with coverage and check thresholds
    Coverage {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// Write the current coverage to the baseline file
        #[arg(long = "save-baseline")]
        save_baseline: bool,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Run tests repeatedly to find flaky, failing and slow tests
    Tests {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        run: RunArgs,

        /// Skip the separate failures report for tests that never passed
        #[arg(long = "no-failures-report")]
        no_failures_report: bool,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Run tests once and write a checklist of failures
    Failures {
        #[command(flatten)]
        target: TargetArgs,

        /// Read a saved `dart test --reporter json` transcript instead of running tests
        #[arg(long = "input")]
        input: Option<PathBuf>,

        #[command(flatten)]
        workers: WorkerArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run coverage and reliability analysis and score overall health
    Suite {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect and clean up written reports
    Reports {
        #[command(subcommand)]
        command: ReportsCommand,
    },

    /// Show coverage history and progress toward a target
    Progress {
        /// Test-side or source-side path of the module
        path: String,

        #[arg(long = "module-name")]
        module_name: Option<String>,

        /// Target coverage percentage
        #[arg(long = "target", default_value_t = DEFAULT_TARGET_PERCENT)]
        target: f64,

        #[command(flatten)]
        location: ReportLocation,
    },

    /// Write a default .test-analyzer.toml
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        #[arg(long = "project-root", default_value = ".")]
        project_root: PathBuf,
    },
}

/// Project root and report directory for commands that only read reports.
#[derive(Args, Debug, Clone)]
pub struct ReportLocation {
    #[arg(long = "project-root", default_value = ".")]
    pub project_root: PathBuf,

    #[arg(long = "report-root")]
    pub report_root: Option<PathBuf>,
}

impl ReportLocation {
    pub fn report_root(&self, config: &AnalyzerConfig) -> PathBuf {
        let root = config.report_root(self.report_root.clone());
        if root.is_absolute() {
            root
        } else {
            self.project_root.join(root)
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// List report pairs, newest first
    List {
        #[arg(long = "type", value_enum)]
        report_type: Option<ReportType>,

        /// Only this qualified module name
        #[arg(long = "module")]
        module: Option<String>,

        #[command(flatten)]
        location: ReportLocation,
    },

    /// Apply retention to every module and tool
    Clean {
        #[arg(long = "type", value_enum)]
        report_type: Option<ReportType>,

        #[arg(long = "keep")]
        keep: Option<usize>,

        /// Show what would be deleted without deleting
        #[arg(long = "dry-run")]
        dry_run: bool,

        #[command(flatten)]
        location: ReportLocation,
    },

    /// Print the qualified module name computed for a path
    Name { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_checklist_flags_are_exclusive() {
        let err = Cli::try_parse_from([
            "test-analyzer",
            "coverage",
            "test/auth",
            "--no-checklist",
            "--minimal-checklist",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_global_verbosity_after_subcommand() {
        let cli = Cli::try_parse_from(["test-analyzer", "tests", "test/auth", "--runs", "5", "-vv"])
            .unwrap();
        assert_eq!(cli.verbosity, 2);
        match cli.command {
            Commands::Tests { run, output, .. } => {
                assert_eq!(run.runs, Some(5));
                assert_eq!(output.checklist_mode(), ChecklistMode::Full);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_forwarded_flags() {
        let thresholds = ThresholdArgs {
            min_coverage: Some(85.0),
            fail_on_decrease: true,
            ..Default::default()
        };
        assert_eq!(
            thresholds.to_args(),
            vec!["--min-coverage", "85", "--fail-on-decrease"]
        );
        let run = RunArgs {
            runs: Some(4),
            workers: WorkerArgs {
                parallel: true,
                workers: None,
            },
            ..Default::default()
        };
        assert_eq!(run.to_args(), vec!["--runs", "4", "--parallel"]);
    }

    #[test]
    fn test_workers_resolution() {
        let config = AnalyzerConfig::default();
        assert_eq!(WorkerArgs::default().resolve(&config), None);
        let explicit = WorkerArgs {
            parallel: false,
            workers: Some(3),
        };
        assert_eq!(explicit.resolve(&config), Some(3));
        let parallel = WorkerArgs {
            parallel: true,
            workers: None,
        };
        assert!(parallel.resolve(&config).unwrap() >= 1);
    }
}
