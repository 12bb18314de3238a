//! Rewrite rule parsing.
//!
//! A rule line reads `<pattern> <target> [<flags>]`. Only rules whose flags
//! carry an `H=` hostname constraint are testable; every other line is
//! skipped. Testable lines that do not fit the grammar fail loudly so that a
//! broken rule can never be counted as covered.
pub mod corpus;

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Capture group that marks a wildcard suffix in a match pattern.
pub const WILDCARD_GROUP: &str = "(.*)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    #[error("rule {line:?} has a hostname constraint but no rewrite target")]
    MissingTarget { line: String },
    #[error("rule {line:?} has an empty hostname constraint")]
    EmptyHostname { line: String },
    #[error("rule {line:?} has a hostname constraint but is malformed: {reason}")]
    Malformed { line: String, reason: &'static str },
    #[error("rule pattern {pattern:?} is unsupported: {reason}")]
    UnsupportedPattern {
        pattern: String,
        reason: &'static str,
    },
}

/// Structured form of a match pattern, parsed once per rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePattern {
    /// Anchored literal path, regex escapes removed.
    Literal { path: String },
    /// Literal prefix followed by a trailing `(.*)` group.
    WildcardSuffix { prefix_segments: Vec<String> },
}

impl RulePattern {
    pub fn parse(pattern: &str) -> Result<Self, RuleParseError> {
        let body = pattern_body(pattern);
        match body.matches(WILDCARD_GROUP).count() {
            0 => Ok(RulePattern::Literal {
                path: unescape(body),
            }),
            1 => {
                let Some(prefix) = body.strip_suffix(WILDCARD_GROUP) else {
                    return Err(RuleParseError::UnsupportedPattern {
                        pattern: pattern.to_string(),
                        reason: "wildcard group must end the pattern",
                    });
                };
                let prefix_segments = unescape(prefix)
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(RulePattern::WildcardSuffix { prefix_segments })
            }
            _ => Err(RuleParseError::UnsupportedPattern {
                pattern: pattern.to_string(),
                reason: "more than one wildcard group",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFlag {
    pub key: String,
    pub value: Option<String>,
}

impl RuleFlag {
    fn parse(token: &str) -> Self {
        match token.split_once('=') {
            Some((key, value)) => RuleFlag {
                key: key.trim().to_string(),
                value: Some(value.trim().to_string()),
            },
            None => RuleFlag {
                key: token.trim().to_string(),
                value: None,
            },
        }
    }
}

/// One testable rule from the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub match_pattern: String,
    pub pattern: RulePattern,
    pub rewrite_target: String,
    pub flags: Vec<RuleFlag>,
    pub hostname: String,
}

impl Rule {
    /// Key of this rule's slot in the test corpus.
    pub fn identity(&self) -> String {
        format!("{}{}", self.hostname, self.match_pattern)
    }

    pub fn flag(&self, key: &str) -> Option<&RuleFlag> {
        self.flags.iter().find(|flag| flag.key == key)
    }

    /// Status requested by an `R=<code>` flag, if any.
    pub fn redirect_status(&self) -> Option<u16> {
        self.flag("R")?.value.as_deref()?.parse().ok()
    }
}

/// Parse one corpus line. `Ok(None)` means the line has no hostname
/// constraint and is not testable; a line that has one must fit the grammar.
pub fn parse_rule(line: &str) -> Result<Option<Rule>, RuleParseError> {
    if hostname_flag_value(line).is_none() {
        return Ok(None);
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let flags_text = tokens.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();

    let Some(raw_hostname) = hostname_flag_value(&flags_text) else {
        if tokens.len() == 2 && hostname_flag_value(tokens[1]).is_some() {
            return Err(RuleParseError::MissingTarget {
                line: line.to_string(),
            });
        }
        let reason = if tokens.len() < 3 {
            "expected a pattern, a target and flags separated by whitespace"
        } else {
            "hostname flag is outside the flags group"
        };
        return Err(RuleParseError::Malformed {
            line: line.to_string(),
            reason,
        });
    };

    let hostname = hostname_from_flag(raw_hostname);
    if hostname.is_empty() {
        return Err(RuleParseError::EmptyHostname {
            line: line.to_string(),
        });
    }

    let match_pattern = tokens[0].to_string();
    let pattern = RulePattern::parse(&match_pattern)?;
    Ok(Some(Rule {
        pattern,
        match_pattern,
        rewrite_target: tokens[1].to_string(),
        flags: parse_flags(&flags_text),
        hostname,
    }))
}

fn hostname_flag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?:^|[\s\[,|])H=([^\s\]]*)").expect("regex for hostname flag")
    })
}

fn hostname_flag_value(text: &str) -> Option<&str> {
    hostname_flag_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str())
}

/// First alternative of an `H=` value with anchors and terminators removed.
fn hostname_from_flag(value: &str) -> String {
    let first = value.split('|').next().unwrap_or_default();
    let first = first.split(',').next().unwrap_or_default();
    let unanchored = first.rsplit('^').next().unwrap_or_default();
    unanchored
        .split('$')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Split a flag group on `,` and `|`. Pieces that are not `KEY[=VALUE]`
/// tokens are further alternatives of the preceding `H=` value.
fn parse_flags(text: &str) -> Vec<RuleFlag> {
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix('[').unwrap_or(trimmed);
    let inner = inner.strip_suffix(']').unwrap_or(inner);

    let mut flags: Vec<RuleFlag> = Vec::new();
    for (separator, piece) in flag_pieces(inner) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match flags.last_mut() {
            Some(RuleFlag {
                key,
                value: Some(value),
            }) if key == "H" && !is_flag_token(piece) => {
                value.push(separator);
                value.push_str(piece);
            }
            _ => flags.push(RuleFlag::parse(piece)),
        }
    }
    flags
}

/// Pieces of a flag group, each with the separator that preceded it.
fn flag_pieces(text: &str) -> Vec<(char, &str)> {
    let mut pieces = Vec::new();
    let mut separator = ',';
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if ch == ',' || ch == '|' {
            pieces.push((separator, &text[start..idx]));
            separator = ch;
            start = idx + ch.len_utf8();
        }
    }
    pieces.push((separator, &text[start..]));
    pieces
}

fn is_flag_token(piece: &str) -> bool {
    let key = piece.split_once('=').map_or(piece, |(key, _)| key).trim();
    !key.is_empty() && key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Text between the last `^` anchor and the first `$` terminator.
fn pattern_body(pattern: &str) -> &str {
    let anchored = pattern.rsplit('^').next().unwrap_or(pattern);
    anchored.split('$').next().unwrap_or(anchored)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
            continue;
        }
        out.push(ch);
    }
    out
}
