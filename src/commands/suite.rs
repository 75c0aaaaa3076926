use super::{finish, Environment};
use crate::cli::{OutputArgs, RunArgs, TargetArgs, ThresholdArgs};
use crate::process::SystemRunner;
use crate::suite::{SuiteOptions, SuiteOrchestrator};
use anyhow::{Context, Result};
use std::time::Duration;

pub fn handle_suite(
    target: &TargetArgs,
    thresholds: &ThresholdArgs,
    run: &RunArgs,
    output: &OutputArgs,
    verbosity: u8,
) -> Result<i32> {
    let env = Environment::load(target);
    let executable =
        std::env::current_exe().context("Cannot locate the test-analyzer executable")?;

    let mut coverage_args = thresholds.to_args();
    let mut tests_args = run.to_args();
    if let Some(timeout) = target.timeout_secs {
        for args in [&mut coverage_args, &mut tests_args] {
            args.extend(["--timeout".to_string(), timeout.to_string()]);
        }
    }

    // A child runs up to `runs` test invocations plus the coverage pair
    let per_process = env.config.timeout_secs(target.timeout_secs);
    let steps = env.config.runs(run.runs) as u64 + 2;
    let runner = SystemRunner::new(Duration::from_secs(per_process.saturating_mul(steps)));

    let options = SuiteOptions {
        coverage_args,
        tests_args,
        verbose: verbosity,
        report: output.report_options(&env.config),
    };
    let orchestrator = SuiteOrchestrator::new(runner, executable, target.target(), options);
    let outcome = orchestrator.run()?;
    Ok(finish(&outcome))
}
