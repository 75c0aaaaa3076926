//! CLI command implementations.
//!
//! Each analyzer command loads the project configuration, layers its flags
//! over it, runs the analyzer once (or under `--watch`), and turns the
//! [`Outcome`] into a process exit code.

pub mod coverage;
pub mod failures;
pub mod init;
pub mod progress;
pub mod reliability;
pub mod reports;
pub mod suite;

pub use coverage::handle_coverage;
pub use failures::handle_failures;
pub use init::init_config;
pub use progress::handle_progress;
pub use reliability::handle_tests;
pub use reports::handle_reports;
pub use suite::handle_suite;

use crate::cli::{Cli, Commands, TargetArgs, WatchArgs};
use crate::config::{load_config, AnalyzerConfig};
use crate::errors::{Result as AnalyzerResult, EXIT_OK};
use crate::pipeline::{Outcome, Target};
use crate::process::{DartTool, SystemRunner};
use crate::watch;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;

/// Configuration and process plumbing shared by the analyzer commands.
pub struct Environment {
    pub config: AnalyzerConfig,
    pub runner: SystemRunner,
    pub dart: DartTool,
}

impl Environment {
    pub fn load(target: &TargetArgs) -> Self {
        let config = load_config(&target.project_root);
        let timeout = Duration::from_secs(config.timeout_secs(target.timeout_secs));
        let dart = DartTool::locate(
            config.process.dart_executable.clone(),
            &target.project_root,
        );
        Self {
            config,
            runner: SystemRunner::new(timeout),
            dart,
        }
    }
}

/// Dispatch a parsed command line; returns the process exit code.
pub fn execute(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Coverage {
            target,
            thresholds,
            save_baseline,
            output,
            watch,
        } => handle_coverage(&target, &thresholds, save_baseline, &output, &watch),
        Commands::Tests {
            target,
            run,
            no_failures_report,
            output,
            watch,
        } => handle_tests(&target, &run, no_failures_report, &output, &watch),
        Commands::Failures {
            target,
            input,
            workers,
            output,
        } => handle_failures(&target, input, &workers, &output),
        Commands::Suite {
            target,
            thresholds,
            run,
            output,
        } => handle_suite(&target, &thresholds, &run, &output, cli.verbosity),
        Commands::Reports { command } => handle_reports(command),
        Commands::Progress {
            path,
            module_name,
            target,
            location,
        } => handle_progress(&path, module_name, target, &location),
        Commands::Init {
            force,
            project_root,
        } => init_config(&project_root, force).map(|_| EXIT_OK),
    }
}

/// Summarize where reports went and pass the exit code through.
pub fn finish(outcome: &Outcome) -> i32 {
    for report in &outcome.reports {
        eprintln!(
            "{} {}",
            "Report written:".green().bold(),
            report.markdown_path.display()
        );
    }
    if outcome.exit_code != EXIT_OK {
        eprintln!(
            "{} {} (exit code {})",
            "Analysis finished with problems for".yellow(),
            outcome.module_name.bold(),
            outcome.exit_code
        );
    }
    outcome.exit_code
}

/// Run once, or keep re-running on changes when `--watch` is set.
pub fn run_or_watch<F>(target: &Target, watch_args: &WatchArgs, mut run: F) -> Result<i32>
where
    F: FnMut() -> AnalyzerResult<Outcome>,
{
    if !watch_args.watch {
        let outcome = run()?;
        return Ok(finish(&outcome));
    }

    let resolved = target.resolve()?;
    let test_path = target.absolute(Path::new(&resolved.paths.test_path));
    let source_path = target.absolute(Path::new(&resolved.paths.source_path));
    eprintln!(
        "{} {} and {} (Ctrl-C to stop)",
        "Watching".cyan().bold(),
        resolved.paths.test_path,
        resolved.paths.source_path
    );
    watch::watch(
        &[test_path.as_path(), source_path.as_path()],
        Duration::from_secs(watch_args.poll_interval.max(1)),
        || {
            let outcome = run()?;
            finish(&outcome);
            Ok(outcome)
        },
    )?;
    Ok(EXIT_OK)
}
