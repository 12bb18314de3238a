//! Boundary to the external rule evaluator.
//!
//! The evaluator is opaque: it receives a request and answers with a status
//! and headers. Everything that talks to it goes through [`Evaluator`] so the
//! comparison logic can run against an in-memory fake.
pub mod event;
pub mod process;

use crate::serde_helpers::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

pub use process::ProcessEvaluator;

/// Request handed to the evaluator for one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    pub hostname: String,
    pub path: String,
    pub querystring: String,
}

impl RequestDescriptor {
    /// Split `host/path?query` into its parts. A URL without a path maps to
    /// `/`.
    pub fn from_event_url(event_url: &str) -> Self {
        let (hostname, rest) = match event_url.find(['/', '?']) {
            Some(idx) => (&event_url[..idx], &event_url[idx..]),
            None => (event_url, ""),
        };
        let (path, querystring) = match rest.split_once('?') {
            Some((path, query)) => (path, query),
            None => (rest, ""),
        };
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
        RequestDescriptor {
            hostname: hostname.to_string(),
            path,
            querystring: querystring.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

/// Response document returned by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<HeaderEntry>>,
}

impl ResponseDescriptor {
    #[cfg(test)]
    pub fn redirect(status: u16, location: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "location".to_string(),
            vec![HeaderEntry {
                key: Some("Location".to_string()),
                value: location.to_string(),
            }],
        );
        ResponseDescriptor {
            status: StatusCode::new(status),
            headers,
        }
    }

    /// First `location` header value, if the response has one.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("location")
            .and_then(|values| values.first())
            .map(|entry| entry.value.as_str())
    }
}

/// Reasons the evaluator produced no usable response.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("failed to start evaluator: {0}")]
    Spawn(String),
    #[error("evaluator timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
    #[error("evaluator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("evaluator returned malformed response: {0}")]
    MalformedResponse(String),
    #[error("evaluator I/O failed: {0}")]
    Io(String),
}

/// Capability to evaluate one request against the rewrite rules.
pub trait Evaluator: Sync {
    fn evaluate(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, EvaluationError>;
}
