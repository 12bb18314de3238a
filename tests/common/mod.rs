//! Shared test infrastructure for integration tests.
//!
//! Builds the stock on-disk layout in a temp dir:
//!
//! ```text
//! <root>/tests/harness.json        (runs the script through /bin/sh)
//! <root>/tests/event-template.json
//! <root>/tests/tests.json          (optional)
//! <root>/rules/rules.json
//! <root>/sam/test_event.sh         (prints sam/response.json)
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const EVENT_TEMPLATE: &str = r#"{
  "Records": [
    {
      "cf": {
        "config": {"eventType": "viewer-request"},
        "request": {
          "clientIp": "203.0.113.178",
          "headers": {"host": [{"key": "Host", "value": "placeholder"}]},
          "method": "GET",
          "querystring": "",
          "uri": "/"
        }
      }
    }
  ]
}
"#;

const HARNESS_CONFIG: &str = r#"{
  "schema_version": 1,
  "evaluator": {
    "command": ["/bin/sh", "./test_event.sh", "{event}", "../rules/rules.json"],
    "timeout_secs": 30
  }
}
"#;

// Fails unless it was handed an existing event file.
const EVALUATOR_SCRIPT: &str = "#!/bin/sh\n[ -f \"$1\" ] || exit 3\ncat response.json\n";

pub struct TestFixture {
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestFixture {
    /// Layout with the given rule lines and an evaluator answering `status`/`location`.
    pub fn new(rules: &[&str], status: u16, location: &str) -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        fs::create_dir_all(root.join("tests"))?;
        fs::create_dir_all(root.join("rules"))?;
        fs::create_dir_all(root.join("sam"))?;

        fs::write(root.join("tests/event-template.json"), EVENT_TEMPLATE)?;
        fs::write(
            root.join("rules/rules.json"),
            serde_json::to_vec_pretty(&rules)?,
        )?;
        fs::write(root.join("tests/harness.json"), HARNESS_CONFIG)?;
        fs::write(root.join("sam/test_event.sh"), EVALUATOR_SCRIPT)?;

        let fixture = Self {
            _temp_dir: temp_dir,
            root,
        };
        fixture.set_response(status, location)?;
        Ok(fixture)
    }

    /// Change what the evaluator answers from now on.
    pub fn set_response(&self, status: u16, location: &str) -> anyhow::Result<()> {
        let response = serde_json::json!({
            "status": status.to_string(),
            "statusDescription": "Found",
            "headers": {
                "location": [{"key": "Location", "value": location}]
            }
        });
        fs::write(
            self.root.join("sam/response.json"),
            serde_json::to_vec_pretty(&response)?,
        )?;
        Ok(())
    }

    pub fn test_dir(&self) -> PathBuf {
        self.root.join("tests")
    }

    pub fn tests_json(&self) -> PathBuf {
        self.test_dir().join("tests.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.test_dir().join("temp_results/tests.xml")
    }

    /// Run the tester against this layout with extra flags.
    pub fn run(&self, extra: &[&str]) -> anyhow::Result<Output> {
        let output = Command::new(env!("CARGO_BIN_EXE_rewrite-tester"))
            .arg("--test-path")
            .arg(self.test_dir())
            .args(extra)
            .env_remove("RUST_LOG")
            .output()?;
        Ok(output)
    }
}

/// Skip when no POSIX shell is available for the evaluator script.
pub fn skip_if_shell_missing() -> bool {
    let missing = !Path::new("/bin/sh").is_file();
    if missing {
        eprintln!("Skipping: /bin/sh not available");
    }
    missing
}
