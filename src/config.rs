//! Harness configuration.
//!
//! Defaults reproduce the stock layout (`tests.json`, `event-template.json`,
//! `../rules/rules.json`, a SAM wrapper script in `../sam`). An optional
//! `harness.json` in the test directory overrides them, and CLI flags
//! override both.
use crate::evaluator::process::EVENT_PLACEHOLDER;
use crate::paths::{
    TestDirPaths, EVENT_TEMPLATE_REL, REPORT_REL, RULES_REL, SAM_DIR_REL, TESTS_REL,
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_JOBS: usize = 1;

/// Command given either as an argv list or as one shell-style line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Argv(Vec<String>),
    Line(String),
}

impl CommandSpec {
    pub fn argv(&self) -> Result<Vec<String>> {
        let argv = match self {
            CommandSpec::Argv(argv) => argv.clone(),
            CommandSpec::Line(line) => {
                shell_words::split(line).with_context(|| format!("parse command: {line}"))?
            }
        };
        if !matches!(argv.first(), Some(program) if !program.trim().is_empty()) {
            return Err(anyhow!("command is empty"));
        }
        Ok(argv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    #[serde(default = "default_evaluator_command")]
    pub command: CommandSpec,
    #[serde(default = "default_sam_dir")]
    pub cwd: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            command: default_evaluator_command(),
            cwd: default_sam_dir(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default = "default_build_command")]
    pub command: CommandSpec,
    #[serde(default = "default_sam_dir")]
    pub cwd: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            cwd: default_sam_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    pub schema_version: u32,
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,
    #[serde(default = "default_tests_path")]
    pub tests_path: PathBuf,
    #[serde(default = "default_event_template_path")]
    pub event_template_path: PathBuf,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            rules_path: default_rules_path(),
            tests_path: default_tests_path(),
            event_template_path: default_event_template_path(),
            report_path: default_report_path(),
            evaluator: EvaluatorConfig::default(),
            build: BuildConfig::default(),
            jobs: DEFAULT_JOBS,
        }
    }
}

impl HarnessConfig {
    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluator.timeout_secs)
    }
}

/// Overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub report_path: Option<PathBuf>,
}

/// Load `harness.json` when present, falling back to defaults.
pub fn load_config(paths: &TestDirPaths) -> Result<HarnessConfig> {
    let path = paths.config_path();
    if !path.is_file() {
        return Ok(HarnessConfig::default());
    }
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: HarnessConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded harness config");
    Ok(config)
}

pub fn apply_overrides(config: &mut HarnessConfig, overrides: &ConfigOverrides) {
    if let Some(jobs) = overrides.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout_secs) = overrides.timeout_secs {
        config.evaluator.timeout_secs = timeout_secs;
    }
    if let Some(report_path) = overrides.report_path.as_ref() {
        config.report_path = report_path.clone();
    }
}

pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported harness config schema_version {}",
            config.schema_version
        ));
    }
    if config.jobs == 0 {
        return Err(anyhow!("jobs must be > 0"));
    }
    if config.evaluator.timeout_secs == 0 {
        return Err(anyhow!("evaluator.timeout_secs must be > 0"));
    }
    let evaluator_argv = config
        .evaluator
        .command
        .argv()
        .context("validate evaluator.command")?;
    if !evaluator_argv
        .iter()
        .any(|arg| arg.contains(EVENT_PLACEHOLDER))
    {
        return Err(anyhow!(
            "evaluator.command must pass the event file via {EVENT_PLACEHOLDER}"
        ));
    }
    config.build.command.argv().context("validate build.command")?;
    Ok(())
}

fn default_evaluator_command() -> CommandSpec {
    CommandSpec::Argv(vec![
        "./test_event.sh".to_string(),
        EVENT_PLACEHOLDER.to_string(),
        "../rules/rules.json".to_string(),
    ])
}

fn default_build_command() -> CommandSpec {
    CommandSpec::Argv(vec![
        "sam".to_string(),
        "build".to_string(),
        "--use-container".to_string(),
    ])
}

fn default_sam_dir() -> PathBuf {
    PathBuf::from(SAM_DIR_REL)
}

fn default_rules_path() -> PathBuf {
    PathBuf::from(RULES_REL)
}

fn default_tests_path() -> PathBuf {
    PathBuf::from(TESTS_REL)
}

fn default_event_template_path() -> PathBuf {
    PathBuf::from(EVENT_TEMPLATE_REL)
}

fn default_report_path() -> PathBuf {
    PathBuf::from(REPORT_REL)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_jobs() -> usize {
    DEFAULT_JOBS
}
