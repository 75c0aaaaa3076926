use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use test_analyzer::cli::Cli;
use test_analyzer::errors::{exit_code_for, AnalyzerError};
use test_analyzer::observability::{init_logging, install_panic_hook};

fn main() -> ExitCode {
    install_panic_hook();
    // clap exits with 2 on usage errors
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match test_analyzer::commands::execute(cli) {
        Ok(code) => exit_code(code),
        Err(error) => {
            report_error(&error);
            exit_code(exit_code_for(&error))
        }
    }
}

fn report_error(error: &anyhow::Error) {
    eprintln!("{} {:#}", "error:".red().bold(), error);
    let usage = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AnalyzerError>())
        .is_some_and(AnalyzerError::is_usage_error);
    if usage {
        eprintln!("{}", "Run `test-analyzer <command> --help` for usage.".dimmed());
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
