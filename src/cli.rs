//! CLI argument parsing for the rewrite rule tester.
//!
//! One flat command: verification by default, generation with
//! `--build-missing-tests`. Flags override `harness.json`.
use clap::Parser;
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "rewrite-tester",
    version,
    about = "Verify redirect rules against recorded expectations",
    after_help = "Exit codes:\n  0  all tests passed (or generation finished)\n  1  at least one test failed\n  2  missing tests, bad input, or build/evaluator failure\n\nExamples:\n  rewrite-tester --test-path ./tests\n  rewrite-tester --test-path ./tests --build --jobs 4\n  rewrite-tester --test-path ./tests --build-missing-tests"
)]
pub struct RootArgs {
    /// Test directory holding tests.json and event-template.json
    #[arg(long, visible_alias = "test_path", value_name = "DIR")]
    pub test_path: PathBuf,

    /// Run the build command before testing
    #[arg(long, visible_alias = "build_sam")]
    pub build: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long)]
    pub debug: bool,

    /// Record tests for uncovered rules from current evaluator output; review the results before committing
    #[arg(long, visible_alias = "build_missing_tests")]
    pub build_missing_tests: bool,

    /// Evaluator processes to run concurrently during verification
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-invocation evaluator timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// JUnit report path, relative to the test directory
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}
