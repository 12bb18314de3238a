//! Generation mode: record expectations for uncovered rules.
//!
//! The evaluator's current answer becomes the expectation (golden capture),
//! so captured tests must be reviewed before they are committed. Rules are
//! processed one at a time and each capture is persisted before the next
//! evaluation starts.
use crate::corpus::{TestCase, TestCorpusStore};
use crate::error::HarnessError;
use crate::evaluator::Evaluator;
use crate::rules::Rule;
use crate::synth::synthesize;
use anyhow::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub created: Vec<String>,
    pub already_covered: usize,
}

pub fn build_missing_tests(
    rules: &[Rule],
    store: &TestCorpusStore,
    evaluator: &dyn Evaluator,
) -> Result<GenerationSummary> {
    let mut tests = store.load()?;
    let mut summary = GenerationSummary::default();

    for rule in rules {
        let identity = rule.identity();
        tracing::debug!(identity = %identity, "checking for test");
        if tests.contains_key(&identity) {
            summary.already_covered += 1;
            continue;
        }
        tracing::info!(
            identity = %identity,
            rewrite_target = %rule.rewrite_target,
            "missing test, generating"
        );

        let request = synthesize(rule);
        let observed = evaluator.evaluate(&request.descriptor).map_err(|source| {
            HarnessError::GenerationInvocation {
                identity: identity.clone(),
                source,
            }
        })?;
        if let Some(flag_status) = rule.redirect_status() {
            if flag_status != observed.status.code() {
                tracing::warn!(
                    identity = %identity,
                    flag_status,
                    observed_status = observed.status.code(),
                    "captured status differs from the rule's R= flag"
                );
            }
        }

        let test = TestCase::new(
            request.event_url,
            observed.status.clone(),
            observed.location().unwrap_or_default(),
        );
        tracing::debug!(
            identity = %identity,
            event_url = %test.event_url,
            result_status = %test.result_status,
            result_location = %test.result_location,
            "created test"
        );
        store.upsert(&mut tests, &identity, test)?;
        summary.created.push(identity);
    }

    Ok(summary)
}
