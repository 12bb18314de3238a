//! Recorded test cases keyed by rule identity.
//!
//! The corpus file is the only source of expected behavior. It is rewritten
//! in full, atomically, on every change so a crash between two upserts keeps
//! everything recorded before it. Rewrites keep what the file already holds
//! byte for byte: statuses stay in their written form, unknown per-test
//! fields are carried along, and the file's trailing-newline convention is
//! kept.
use crate::serde_helpers::StatusCode;
use crate::util::write_atomic;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Expected result for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub event_url: String,
    pub result_location: String,
    pub result_status: StatusCode,
    /// Fields this tool does not interpret, kept for rewrites.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TestCase {
    pub fn new(
        event_url: impl Into<String>,
        result_status: impl Into<StatusCode>,
        result_location: impl Into<String>,
    ) -> Self {
        Self {
            event_url: event_url.into(),
            result_location: result_location.into(),
            result_status: result_status.into(),
            extra: BTreeMap::new(),
        }
    }
}

pub type TestCorpus = BTreeMap<String, TestCase>;

#[derive(Debug, Clone)]
pub struct TestCorpusStore {
    path: PathBuf,
}

impl TestCorpusStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the corpus; a missing file is an empty corpus.
    pub fn load(&self) -> Result<TestCorpus> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "test corpus missing, starting empty");
            return Ok(TestCorpus::new());
        }
        let bytes =
            fs::read(&self.path).with_context(|| format!("read tests {}", self.path.display()))?;
        let corpus: TestCorpus = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse tests JSON {}", self.path.display()))?;
        Ok(corpus)
    }

    /// Rewrite the whole corpus with every object's keys sorted.
    pub fn save(&self, corpus: &TestCorpus) -> Result<()> {
        // Value maps are ordered, so extra fields sort among the known ones.
        let value = serde_json::to_value(corpus).context("serialize test corpus")?;
        let mut text = serde_json::to_string_pretty(&value).context("serialize test corpus")?;
        if self.trailing_newline()? {
            text.push('\n');
        }
        write_atomic(&self.path, text.as_bytes())
    }

    /// Record one test case and persist before returning.
    pub fn upsert(&self, corpus: &mut TestCorpus, identity: &str, test: TestCase) -> Result<()> {
        corpus.insert(identity.to_string(), test);
        self.save(corpus)
            .with_context(|| format!("persist test for {identity}"))
    }

    /// Whether a rewrite should end with a newline: as the current file
    /// does, or yes for a new file.
    fn trailing_newline(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(true);
        }
        let bytes =
            fs::read(&self.path).with_context(|| format!("read tests {}", self.path.display()))?;
        Ok(bytes.is_empty() || bytes.ends_with(b"\n"))
    }
}
