//! Synthetic request construction for uncovered rules.
//!
//! This is a heuristic over [`RulePattern`], not a regex interpreter: it
//! relies on patterns being anchored literals, optionally ending in a single
//! `(.*)` group.
use crate::evaluator::RequestDescriptor;
use crate::rules::{Rule, RulePattern};

/// Leaf appended under a wildcard prefix so the request looks like a file.
pub const PLACEHOLDER_LEAF: &str = "some/file.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRequest {
    /// `hostname + path [+ ?querystring]`, as stored in the test corpus.
    pub event_url: String,
    pub descriptor: RequestDescriptor,
}

pub fn synthesize(rule: &Rule) -> SyntheticRequest {
    let path = synthesized_path(&rule.pattern);
    let event_url = collapse_slashes(&format!("{}{}", rule.hostname, path));
    let descriptor = RequestDescriptor::from_event_url(&event_url);
    SyntheticRequest {
        event_url,
        descriptor,
    }
}

fn synthesized_path(pattern: &RulePattern) -> String {
    match pattern {
        RulePattern::WildcardSuffix { prefix_segments } => {
            let mut path = String::from("/");
            for segment in prefix_segments {
                path.push_str(segment);
                path.push('/');
            }
            path.push_str(PLACEHOLDER_LEAF);
            path
        }
        RulePattern::Literal { path } if path.starts_with('/') => path.clone(),
        RulePattern::Literal { path } => format!("/{path}"),
    }
}

fn collapse_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut previous_slash = false;
    for ch in url.chars() {
        let slash = ch == '/';
        if !(slash && previous_slash) {
            out.push(ch);
        }
        previous_slash = slash;
    }
    out
}
