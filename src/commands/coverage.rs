use super::{run_or_watch, Environment};
use crate::cli::{OutputArgs, TargetArgs, ThresholdArgs, WatchArgs};
use crate::coverage::{CoverageAnalyzer, CoverageOptions};
use anyhow::Result;

pub fn handle_coverage(
    target: &TargetArgs,
    thresholds: &ThresholdArgs,
    save_baseline: bool,
    output: &OutputArgs,
    watch: &WatchArgs,
) -> Result<i32> {
    let env = Environment::load(target);
    let options = CoverageOptions {
        thresholds: env.config.coverage_thresholds(
            thresholds.min_coverage,
            thresholds.warn_coverage,
            thresholds.fail_on_decrease,
        )?,
        baseline_path: thresholds
            .baseline
            .clone()
            .or_else(|| env.config.coverage.baseline.clone()),
        save_baseline,
        report: output.report_options(&env.config),
    };
    let analyzer = CoverageAnalyzer::new(env.runner, env.dart, target.target(), options);
    run_or_watch(analyzer.target(), watch, || analyzer.run())
}
