//! Coverage audit between the rule corpus and the test corpus.
use crate::corpus::TestCorpus;
use crate::rules::Rule;
use std::collections::BTreeSet;

/// Identities of rules with no recorded test, in corpus order, each once.
pub fn find_missing(rules: &[Rule], tests: &TestCorpus) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut missing = Vec::new();
    for rule in rules {
        let identity = rule.identity();
        if tests.contains_key(&identity) || !seen.insert(identity.clone()) {
            continue;
        }
        missing.push(identity);
    }
    missing
}

/// Recorded identities that no longer match any rule, sorted.
pub fn find_stale(rules: &[Rule], tests: &TestCorpus) -> Vec<String> {
    let known: BTreeSet<String> = rules.iter().map(Rule::identity).collect();
    tests
        .keys()
        .filter(|identity| !known.contains(*identity))
        .cloned()
        .collect()
}
