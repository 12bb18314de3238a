//! Typed paths into a test directory.
//!
//! Every configured path is relative to the test directory unless it is
//! absolute.
use crate::util::resolve_relative;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_REL: &str = "harness.json";
pub const TESTS_REL: &str = "tests.json";
pub const EVENT_TEMPLATE_REL: &str = "event-template.json";
pub const RULES_REL: &str = "../rules/rules.json";
pub const REPORT_REL: &str = "temp_results/tests.xml";
pub const SAM_DIR_REL: &str = "../sam";

#[derive(Debug, Clone)]
pub struct TestDirPaths {
    root: PathBuf,
}

impl TestDirPaths {
    /// Canonicalize the test directory so child processes can run elsewhere.
    pub fn open(test_dir: &Path) -> Result<Self> {
        if !test_dir.is_dir() {
            return Err(anyhow!(
                "test directory {} does not exist",
                test_dir.display()
            ));
        }
        let root = test_dir
            .canonicalize()
            .with_context(|| format!("resolve test directory {}", test_dir.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the optional `harness.json` path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_REL)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_relative(&self.root, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(TestDirPaths::open(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn resolve_joins_relative_paths_onto_canonical_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = TestDirPaths::open(dir.path()).expect("open");
        assert!(paths.root().is_absolute());
        assert_eq!(paths.resolve(Path::new(TESTS_REL)), paths.root().join("tests.json"));
        assert_eq!(paths.config_path(), paths.root().join("harness.json"));
    }
}
