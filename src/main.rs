use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod build;
mod cli;
mod config;
mod corpus;
mod coverage;
mod error;
mod evaluator;
mod exec;
mod generate;
mod paths;
mod report;
mod rules;
mod runner;
mod serde_helpers;
mod synth;
mod util;
mod workflow;

fn main() -> ExitCode {
    let args = cli::RootArgs::parse();
    init_tracing(args.debug);

    match workflow::run(&args) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(workflow::INCOMPLETE_EXIT_CODE)
        }
    }
}

/// Logs go to stderr so stdout carries only the run summary.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
