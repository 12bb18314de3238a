//! Fatal harness conditions that end a run with the "incomplete" exit code.

use crate::evaluator::EvaluationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Verification refused: some testable rules have no recorded test.
    #[error("the following tests have not been created:{}", list_identities(.missing))]
    CoverageGap { missing: Vec<String> },

    #[error("build command failed with {status}")]
    BuildFailed { status: String },

    /// Generation stops at the first evaluator failure; earlier captures are kept.
    #[error("evaluator failed while generating a test for {identity}")]
    GenerationInvocation {
        identity: String,
        #[source]
        source: EvaluationError,
    },
}

fn list_identities(identities: &[String]) -> String {
    identities
        .iter()
        .map(|identity| format!("\n  {identity}"))
        .collect()
}
