//! Rule corpus loading.
use super::{parse_rule, Rule};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Testable rules in corpus order, plus how many lines were skipped.
#[derive(Debug, Clone, Default)]
pub struct RuleCorpus {
    pub rules: Vec<Rule>,
    pub skipped: usize,
}

/// Read the raw rule lines (a JSON array of strings).
pub fn load_rule_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("read rules {}", path.display()))?;
    let lines: Vec<String> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse rules JSON {}", path.display()))?;
    Ok(lines)
}

/// Parse every line, failing on the first malformed testable rule.
pub fn parse_rule_lines(lines: &[String]) -> Result<RuleCorpus> {
    let mut corpus = RuleCorpus::default();
    for (index, line) in lines.iter().enumerate() {
        match parse_rule(line).with_context(|| format!("parse rule #{index}"))? {
            Some(rule) => corpus.rules.push(rule),
            None => corpus.skipped += 1,
        }
    }
    Ok(corpus)
}

pub fn load_rule_corpus(path: &Path) -> Result<RuleCorpus> {
    let lines = load_rule_lines(path)?;
    let corpus = parse_rule_lines(&lines)?;
    tracing::debug!(
        rules = corpus.rules.len(),
        skipped = corpus.skipped,
        path = %path.display(),
        "loaded rule corpus"
    );
    Ok(corpus)
}
