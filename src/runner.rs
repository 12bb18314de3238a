//! Verification runs: replay recorded tests and compare.
//!
//! Every test runs regardless of earlier outcomes. Evaluations are
//! independent, so they may be spread over a bounded pool of scoped threads;
//! results keep corpus order.
use crate::corpus::{TestCase, TestCorpus};
use crate::evaluator::{Evaluator, RequestDescriptor, ResponseDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub expected: String,
    pub observed: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Mismatch {
        mismatches: Vec<FieldMismatch>,
        observed: ResponseDescriptor,
    },
    Errored {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub name: String,
    pub event_url: String,
    pub outcome: TestOutcome,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, TestOutcome::Passed)
    }
}

/// Outcome of one verification run, in corpus order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub results: Vec<TestResult>,
}

impl Report {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|result| result.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|result| !result.passed())
            .map(|result| result.name.as_str())
            .collect()
    }
}

/// Field-by-field comparison; empty means the response matches.
pub fn compare(expected: &TestCase, observed: &ResponseDescriptor) -> Vec<FieldMismatch> {
    let mut mismatches = Vec::new();
    if expected.result_status.code() != observed.status.code() {
        mismatches.push(FieldMismatch {
            field: "status",
            expected: expected.result_status.to_string(),
            observed: observed.status.to_string(),
        });
    }
    let observed_location = observed.location().unwrap_or_default();
    if expected.result_location != observed_location {
        mismatches.push(FieldMismatch {
            field: "location",
            expected: expected.result_location.clone(),
            observed: observed_location.to_string(),
        });
    }
    mismatches
}

pub fn run_test(name: &str, test: &TestCase, evaluator: &dyn Evaluator) -> TestResult {
    tracing::debug!(test = name, event_url = %test.event_url, "running test");
    let request = RequestDescriptor::from_event_url(&test.event_url);
    let outcome = match evaluator.evaluate(&request) {
        Ok(observed) => {
            let mismatches = compare(test, &observed);
            if mismatches.is_empty() {
                tracing::info!(test = name, "test passed");
                TestOutcome::Passed
            } else {
                for mismatch in &mismatches {
                    tracing::warn!(
                        test = name,
                        field = mismatch.field,
                        expected = %mismatch.expected,
                        observed = %mismatch.observed,
                        "test failed"
                    );
                }
                TestOutcome::Mismatch {
                    mismatches,
                    observed,
                }
            }
        }
        Err(err) => {
            tracing::warn!(test = name, error = %err, "evaluator invocation failed");
            TestOutcome::Errored {
                error: err.to_string(),
            }
        }
    };
    TestResult {
        name: name.to_string(),
        event_url: test.event_url.clone(),
        outcome,
    }
}

/// Run every test with at most `jobs` concurrent evaluations.
pub fn run_tests(tests: &TestCorpus, evaluator: &dyn Evaluator, jobs: usize) -> Report {
    let entries: Vec<(&String, &TestCase)> = tests.iter().collect();
    let workers = jobs.clamp(1, entries.len().max(1));
    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<TestResult>>> = Mutex::new(entries.iter().map(|_| None).collect());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let idx = next.fetch_add(1, Ordering::Relaxed);
                let Some((name, test)) = entries.get(idx) else {
                    break;
                };
                let result = run_test(name, test, evaluator);
                let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
                slots[idx] = Some(result);
            });
        }
    });

    let results = slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect();
    Report { results }
}
