//! Serde helpers for loosely typed evaluator and corpus documents.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Number(u64),
    Text(String),
}

/// HTTP status written either as a number or as a string of digits.
///
/// The written form is kept so a document round-trips unchanged; equality
/// between statuses should go through [`StatusCode::code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StatusRepr", into = "StatusRepr")]
pub struct StatusCode {
    code: u16,
    text: Option<String>,
}

impl StatusCode {
    pub fn new(code: u16) -> Self {
        Self { code, text: None }
    }

    pub fn code(&self) -> u16 {
        self.code
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl TryFrom<StatusRepr> for StatusCode {
    type Error = String;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        let (raw, text) = match repr {
            StatusRepr::Number(value) => (value, None),
            StatusRepr::Text(text) => {
                let value = text
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("invalid status {text:?}"))?;
                (value, Some(text))
            }
        };
        let code = u16::try_from(raw).map_err(|_| format!("status {raw} out of range"))?;
        Ok(Self { code, text })
    }
}

impl From<StatusCode> for StatusRepr {
    fn from(status: StatusCode) -> Self {
        match status.text {
            Some(text) => StatusRepr::Text(text),
            None => StatusRepr::Number(u64::from(status.code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Doc {
        status: StatusCode,
    }

    #[test]
    fn accepts_numbers_and_digit_strings() {
        let number: Doc = serde_json::from_str(r#"{"status":302}"#).expect("number");
        let text: Doc = serde_json::from_str(r#"{"status":" 301 "}"#).expect("text");
        assert_eq!(number.status.code(), 302);
        assert_eq!(text.status.code(), 301);
        assert_eq!(text.status.to_string(), "301");
    }

    #[test]
    fn written_form_is_kept() {
        for raw in [r#"{"status":"301"}"#, r#"{"status":302}"#] {
            let doc: Doc = serde_json::from_str(raw).expect("parse");
            assert_eq!(serde_json::to_string(&doc).expect("serialize"), raw);
        }
        assert_ne!(StatusCode::new(301), serde_json::from_str::<StatusCode>("\"301\"").expect("text"));
    }

    #[test]
    fn rejects_garbage_and_overflow() {
        assert!(serde_json::from_str::<Doc>(r#"{"status":"moved"}"#).is_err());
        assert!(serde_json::from_str::<Doc>(r#"{"status":70000}"#).is_err());
    }
}
