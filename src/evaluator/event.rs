//! Request-event templating.
//!
//! The evaluator consumes a viewer-request event document. The harness keeps
//! the template verbatim and only substitutes the host header, URI and
//! querystring.
use super::RequestDescriptor;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const HOST_POINTER: &str = "/Records/0/cf/request/headers/host/0/value";
pub const URI_POINTER: &str = "/Records/0/cf/request/uri";
pub const QUERYSTRING_POINTER: &str = "/Records/0/cf/request/querystring";

const SUBSTITUTED_POINTERS: [&str; 3] = [HOST_POINTER, URI_POINTER, QUERYSTRING_POINTER];

#[derive(Debug, Clone)]
pub struct EventTemplate {
    document: Value,
}

impl EventTemplate {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("read event template {}", path.display()))?;
        let document: Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse event template {}", path.display()))?;
        Self::from_value(document).with_context(|| format!("validate {}", path.display()))
    }

    pub fn from_value(document: Value) -> Result<Self> {
        for pointer in SUBSTITUTED_POINTERS {
            if document.pointer(pointer).is_none() {
                return Err(anyhow!("event template is missing {pointer}"));
            }
        }
        Ok(EventTemplate { document })
    }

    /// Fill the template for one request.
    pub fn render(&self, request: &RequestDescriptor) -> Value {
        let mut event = self.document.clone();
        let substitutions = [
            (HOST_POINTER, &request.hostname),
            (URI_POINTER, &request.path),
            (QUERYSTRING_POINTER, &request.querystring),
        ];
        for (pointer, value) in substitutions {
            if let Some(slot) = event.pointer_mut(pointer) {
                *slot = Value::String(value.clone());
            }
        }
        event
    }
}

#[cfg(test)]
pub(crate) fn sample_template() -> Value {
    serde_json::json!({
        "Records": [{
            "cf": {
                "config": {"eventType": "viewer-request"},
                "request": {
                    "clientIp": "203.0.113.178",
                    "headers": {
                        "host": [{"key": "Host", "value": "placeholder"}]
                    },
                    "method": "GET",
                    "querystring": "",
                    "uri": "/"
                }
            }
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_host_uri_and_querystring_only() {
        let template = EventTemplate::from_value(sample_template()).expect("valid template");
        let request = RequestDescriptor::from_event_url("example.com/a/b?c=d");
        let event = template.render(&request);

        assert_eq!(event.pointer(HOST_POINTER), Some(&Value::from("example.com")));
        assert_eq!(event.pointer(URI_POINTER), Some(&Value::from("/a/b")));
        assert_eq!(event.pointer(QUERYSTRING_POINTER), Some(&Value::from("c=d")));
        assert_eq!(
            event.pointer("/Records/0/cf/request/method"),
            Some(&Value::from("GET"))
        );
    }

    #[test]
    fn render_leaves_template_untouched() {
        let template = EventTemplate::from_value(sample_template()).expect("valid template");
        template.render(&RequestDescriptor::from_event_url("one.example/x"));
        let second = template.render(&RequestDescriptor::from_event_url("two.example/y"));
        assert_eq!(second.pointer(HOST_POINTER), Some(&Value::from("two.example")));
        assert_eq!(second.pointer(URI_POINTER), Some(&Value::from("/y")));
    }

    #[test]
    fn template_missing_host_header_is_rejected() {
        let err = EventTemplate::from_value(serde_json::json!({"Records": []}))
            .expect_err("invalid template");
        assert!(err.to_string().contains(HOST_POINTER));
    }
}
