use super::{finish, Environment};
use crate::cli::{OutputArgs, TargetArgs, WorkerArgs};
use crate::failures::{FailureExtractor, FailureOptions};
use anyhow::Result;
use std::path::PathBuf;

pub fn handle_failures(
    target: &TargetArgs,
    input: Option<PathBuf>,
    workers: &WorkerArgs,
    output: &OutputArgs,
) -> Result<i32> {
    let env = Environment::load(target);
    let options = FailureOptions {
        input,
        workers: workers.resolve(&env.config),
        report: output.report_options(&env.config),
    };
    let extractor = FailureExtractor::new(env.runner, env.dart, target.target(), options);
    let outcome = extractor.run()?;
    Ok(finish(&outcome))
}
