use super::{run_or_watch, Environment};
use crate::cli::{OutputArgs, RunArgs, TargetArgs, WatchArgs};
use crate::reliability::{ReliabilityAnalyzer, ReliabilityOptions};
use anyhow::Result;
use std::io::IsTerminal;

pub fn handle_tests(
    target: &TargetArgs,
    run: &RunArgs,
    no_failures_report: bool,
    output: &OutputArgs,
    watch: &WatchArgs,
) -> Result<i32> {
    let env = Environment::load(target);
    let options = ReliabilityOptions {
        runs: env.config.runs(run.runs),
        slow_threshold_secs: env.config.slow_threshold_secs(run.slow),
        workers: run.workers.resolve(&env.config),
        failures_report: !no_failures_report,
        show_progress: std::io::stderr().is_terminal(),
        report: output.report_options(&env.config),
    };
    let analyzer = ReliabilityAnalyzer::new(env.runner, env.dart, target.target(), options);
    run_or_watch(analyzer.target(), watch, || analyzer.run())
}
