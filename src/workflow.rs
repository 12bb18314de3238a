//! Run orchestration for the two modes.
//!
//! Verification is gated on full coverage; generation fills the gaps. Both
//! start from the same inputs: config, rule corpus, test corpus, evaluator.
use crate::build::run_build;
use crate::cli::RootArgs;
use crate::config::{apply_overrides, load_config, validate_config, ConfigOverrides, HarnessConfig};
use crate::corpus::TestCorpusStore;
use crate::coverage::{find_missing, find_stale};
use crate::error::HarnessError;
use crate::evaluator::event::EventTemplate;
use crate::evaluator::{Evaluator, ProcessEvaluator};
use crate::generate::build_missing_tests;
use crate::paths::TestDirPaths;
use crate::report::{summary_lines, write_junit};
use crate::rules::corpus::load_rule_corpus;
use crate::rules::Rule;
use crate::runner::{run_tests, Report};
use crate::util::display_path;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every test passed.
    Passed,
    /// At least one test failed or errored.
    Failed,
    /// Generation mode finished.
    Generated,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Passed | Outcome::Generated => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::from(1),
        }
    }
}

/// Exit code for runs that could not produce a trustworthy result.
pub const INCOMPLETE_EXIT_CODE: u8 = 2;

pub fn run(args: &RootArgs) -> Result<Outcome> {
    let paths = TestDirPaths::open(&args.test_path)?;
    let mut config = load_config(&paths)?;
    apply_overrides(
        &mut config,
        &ConfigOverrides {
            jobs: args.jobs,
            timeout_secs: args.timeout_secs,
            report_path: args.report.clone(),
        },
    );
    validate_config(&config)?;

    if args.build {
        run_build(&config.build, &paths)?;
    }

    let rules = load_rule_corpus(&paths.resolve(&config.rules_path))?.rules;
    let store = TestCorpusStore::new(paths.resolve(&config.tests_path));
    let evaluator = process_evaluator(&config, &paths)?;

    if args.build_missing_tests {
        run_generate(&rules, &store, &evaluator, &paths)
    } else {
        let report_path = paths.resolve(&config.report_path);
        run_verify(&rules, &store, &evaluator, config.jobs, &report_path)
    }
}

fn process_evaluator(config: &HarnessConfig, paths: &TestDirPaths) -> Result<ProcessEvaluator> {
    let template = EventTemplate::load(&paths.resolve(&config.event_template_path))?;
    let argv = config
        .evaluator
        .command
        .argv()
        .context("resolve evaluator command")?;
    Ok(ProcessEvaluator::new(
        template,
        argv,
        paths.resolve(&config.evaluator.cwd),
        config.evaluator_timeout(),
    ))
}

pub fn run_generate(
    rules: &[Rule],
    store: &TestCorpusStore,
    evaluator: &dyn Evaluator,
    paths: &TestDirPaths,
) -> Result<Outcome> {
    let summary = build_missing_tests(rules, store, evaluator)?;
    warn_stale(rules, store)?;
    println!(
        "Generated {} test(s); {} rule(s) already covered.",
        summary.created.len(),
        summary.already_covered
    );
    if !summary.created.is_empty() {
        tracing::warn!(
            tests = %display_path(store.path(), Some(paths.root())),
            "generated expectations record current evaluator output; review them before committing"
        );
    }
    Ok(Outcome::Generated)
}

pub fn run_verify(
    rules: &[Rule],
    store: &TestCorpusStore,
    evaluator: &dyn Evaluator,
    jobs: usize,
    report_path: &Path,
) -> Result<Outcome> {
    let report = verify(rules, store, evaluator, jobs, report_path)?;
    for line in summary_lines(&report) {
        println!("{line}");
    }
    if report.all_passed() {
        Ok(Outcome::Passed)
    } else {
        Ok(Outcome::Failed)
    }
}

/// Check coverage, run every test and write the report.
pub fn verify(
    rules: &[Rule],
    store: &TestCorpusStore,
    evaluator: &dyn Evaluator,
    jobs: usize,
    report_path: &Path,
) -> Result<Report> {
    let tests = store.load()?;
    let missing = find_missing(rules, &tests);
    if !missing.is_empty() {
        return Err(HarnessError::CoverageGap { missing }.into());
    }
    warn_stale(rules, store)?;

    tracing::info!(tests = tests.len(), jobs, "running tests");
    let report = run_tests(&tests, evaluator, jobs);
    write_junit(report_path, &report)?;
    tracing::debug!(path = %report_path.display(), "wrote report");
    Ok(report)
}

fn warn_stale(rules: &[Rule], store: &TestCorpusStore) -> Result<()> {
    let tests = store.load()?;
    for identity in find_stale(rules, &tests) {
        tracing::warn!(identity = %identity, "recorded test has no matching rule");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::TestCase;
    use crate::evaluator::fake::FakeEvaluator;
    use crate::evaluator::ResponseDescriptor;
    use crate::rules::parse_rule;

    fn rules(lines: &[&str]) -> Vec<Rule> {
        lines
            .iter()
            .filter_map(|line| parse_rule(line).expect("parse"))
            .collect()
    }

    fn test_case(url: &str, status: u16, location: &str) -> TestCase {
        TestCase::new(url, status, location)
    }

    #[test]
    fn coverage_gap_refuses_verification_without_calling_the_evaluator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TestCorpusStore::new(dir.path().join("tests.json"));
        let rules = rules(&[
            "^/a$ /x [H=h.example]",
            "^/b$ /x [H=h.example]",
            "^/c$ /x [H=h.example]",
        ]);
        let mut tests = store.load().expect("load");
        store
            .upsert(&mut tests, "h.example^/a$", test_case("h.example/a", 301, "/x"))
            .expect("upsert");
        store
            .upsert(&mut tests, "h.example^/c$", test_case("h.example/c", 301, "/x"))
            .expect("upsert");

        let evaluator = FakeEvaluator::default();
        let report_path = dir.path().join("temp_results/tests.xml");
        let err = verify(&rules, &store, &evaluator, 1, &report_path).expect_err("gap");
        match err.downcast_ref::<HarnessError>() {
            Some(HarnessError::CoverageGap { missing }) => {
                assert_eq!(missing, &vec!["h.example^/b$".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            evaluator.calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
        assert!(!report_path.exists());
    }

    #[test]
    fn verification_writes_report_and_maps_outcome() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TestCorpusStore::new(dir.path().join("tests.json"));
        let rules = rules(&["^/a$ /x [H=h.example]", "^/b$ /y [H=h.example]"]);
        let mut tests = store.load().expect("load");
        store
            .upsert(&mut tests, "h.example^/a$", test_case("h.example/a", 301, "/x"))
            .expect("upsert");
        store
            .upsert(&mut tests, "h.example^/b$", test_case("h.example/b", 301, "/y"))
            .expect("upsert");
        let report_path = dir.path().join("temp_results/tests.xml");

        let passing = FakeEvaluator::default()
            .with("h.example/a", ResponseDescriptor::redirect(301, "/x"))
            .with("h.example/b", ResponseDescriptor::redirect(301, "/y"));
        let outcome =
            run_verify(&rules, &store, &passing, 2, &report_path).expect("verify");
        assert_eq!(outcome, Outcome::Passed);
        assert!(std::fs::read_to_string(&report_path)
            .expect("report")
            .contains("tests=\"2\" failures=\"0\""));

        let failing = FakeEvaluator::default()
            .with("h.example/a", ResponseDescriptor::redirect(302, "/x"))
            .with("h.example/b", ResponseDescriptor::redirect(301, "/y"));
        let outcome =
            run_verify(&rules, &store, &failing, 1, &report_path).expect("verify");
        assert_eq!(outcome, Outcome::Failed);
        assert!(std::fs::read_to_string(&report_path)
            .expect("report")
            .contains("tests=\"2\" failures=\"1\""));
    }

    #[test]
    fn stale_tests_do_not_block_verification() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TestCorpusStore::new(dir.path().join("tests.json"));
        let rules = rules(&["^/a$ /x [H=h.example]"]);
        let mut tests = store.load().expect("load");
        store
            .upsert(&mut tests, "h.example^/a$", test_case("h.example/a", 301, "/x"))
            .expect("upsert");
        store
            .upsert(&mut tests, "gone.example^/z$", test_case("gone.example/z", 301, "/z"))
            .expect("upsert");
        let evaluator = FakeEvaluator::default()
            .with("h.example/a", ResponseDescriptor::redirect(301, "/x"))
            .with("gone.example/z", ResponseDescriptor::redirect(301, "/z"));

        let report = verify(
            &rules,
            &store,
            &evaluator,
            1,
            &dir.path().join("tests.xml"),
        )
        .expect("verify");
        assert_eq!(report.total(), 2);
        assert!(report.all_passed());
    }
}
