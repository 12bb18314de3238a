//! Evaluator backed by an external command.
//!
//! Each request is rendered into an event file, the configured command is
//! run with `{event}` replaced by that file's path, and stdout is parsed as
//! the response document.
use super::event::EventTemplate;
use super::{EvaluationError, Evaluator, RequestDescriptor, ResponseDescriptor};
use crate::exec::{exit_status_string, run_command};
use crate::util::truncate_bytes;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder in the evaluator argv replaced by the event file path.
pub const EVENT_PLACEHOLDER: &str = "{event}";

const MAX_LOGGED_OUTPUT_BYTES: usize = 4096;

pub struct ProcessEvaluator {
    template: EventTemplate,
    argv: Vec<String>,
    cwd: PathBuf,
    timeout: Duration,
}

impl ProcessEvaluator {
    pub fn new(template: EventTemplate, argv: Vec<String>, cwd: PathBuf, timeout: Duration) -> Self {
        ProcessEvaluator {
            template,
            argv,
            cwd,
            timeout,
        }
    }

    fn write_event(&self, request: &RequestDescriptor) -> Result<tempfile::NamedTempFile, EvaluationError> {
        let event = self.template.render(request);
        let bytes = serde_json::to_vec(&event).map_err(|err| EvaluationError::Io(err.to_string()))?;
        let mut file = tempfile::Builder::new()
            .prefix("rewrite-event-")
            .suffix(".json")
            .tempfile()
            .map_err(|err| EvaluationError::Io(format!("create event file: {err}")))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|err| EvaluationError::Io(format!("write event file: {err}")))?;
        Ok(file)
    }
}

impl Evaluator for ProcessEvaluator {
    fn evaluate(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, EvaluationError> {
        // The event file is removed when `event` drops.
        let event = self.write_event(request)?;
        let event_path = event.path().display().to_string();
        let argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(EVENT_PLACEHOLDER, &event_path))
            .collect();

        let output = run_command(&argv, &self.cwd, Some(self.timeout))
            .map_err(|err| EvaluationError::Spawn(format!("{err:#}")))?;
        tracing::debug!(
            hostname = %request.hostname,
            path = %request.path,
            duration_ms = output.duration_ms,
            stdout = %truncate_bytes(&output.stdout, MAX_LOGGED_OUTPUT_BYTES),
            "evaluator finished"
        );
        if output.timed_out {
            return Err(EvaluationError::TimedOut(self.timeout));
        }
        if !output.status.success() {
            return Err(EvaluationError::Failed {
                status: exit_status_string(&output.status),
                stderr: truncate_bytes(&output.stderr, MAX_LOGGED_OUTPUT_BYTES)
                    .trim()
                    .to_string(),
            });
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|err| EvaluationError::MalformedResponse(err.to_string()))
    }
}
