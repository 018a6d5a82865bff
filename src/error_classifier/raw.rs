//! Raw failure input accepted by the classifier
//!
//! Wallets, RPC nodes and contracts report failures in inconsistent shapes.
//! `RawError` is the sealed boundary type: every shape is converted into it,
//! and only defensive, string-coerced field extraction happens afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured failure with the fields wallet libraries commonly populate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredError {
    pub message: Option<String>,
    /// Error code coerced to a string ("4001", "ACTION_REJECTED")
    pub code: Option<String>,
    pub reason: Option<String>,
    pub details: Option<Value>,
}

/// Any failure crossing the wallet or remote boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawError {
    Message(String),
    Structured(StructuredError),
    Unknown,
}

impl RawError {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    pub fn structured(
        message: Option<&str>,
        code: Option<&str>,
        reason: Option<&str>,
    ) -> Self {
        Self::Structured(StructuredError {
            message: message.map(str::to_string),
            code: code.map(str::to_string),
            reason: reason.map(str::to_string),
            details: None,
        })
    }

    /// Best human-readable text: message, then reason, then a placeholder
    pub fn display_text(&self) -> String {
        match self {
            Self::Message(text) if !text.trim().is_empty() => text.clone(),
            Self::Structured(s) => s
                .message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .or_else(|| s.reason.as_deref().filter(|r| !r.trim().is_empty()))
                .map(str::to_string)
                .unwrap_or_else(|| "Unknown error".to_string()),
            _ => "Unknown error".to_string(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Structured(s) => s.code.as_deref(),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Structured(s) => s.reason.as_deref().filter(|r| !r.trim().is_empty()),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Structured(s) => s.details.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn inspect(&self) -> Inspection {
        let original = self.display_text();
        let mut haystack = original.to_lowercase();
        if let Some(reason) = self.reason() {
            let reason = reason.to_lowercase();
            if !haystack.contains(&reason) {
                haystack.push(' ');
                haystack.push_str(&reason);
            }
        }
        Inspection {
            text: haystack,
            original,
            code: self.code().map(|c| c.trim().to_string()),
            reason: self.reason().map(str::to_string),
        }
    }
}

/// Normalized view of a raw error used by the matching rules
#[derive(Debug, Clone)]
pub(crate) struct Inspection {
    /// Lower-cased message (plus reason when not already contained)
    pub text: String,
    /// Original message, case preserved
    pub original: String,
    pub code: Option<String>,
    pub reason: Option<String>,
}

impl Inspection {
    pub fn contains_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.text.contains(p))
    }

    pub fn code_is_any(&self, codes: &[&str]) -> bool {
        match &self.code {
            Some(code) => codes.iter().any(|c| code.eq_ignore_ascii_case(c)),
            None => false,
        }
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(coerce_string)
        .filter(|s| !s.is_empty())
}

/// Top-level messages that only wrap the real failure nested below them
const WRAPPER_MESSAGES: &[&str] = &[
    "internal json-rpc error",
    "internal error",
    "unknown rpc error",
    "execution failed",
];

fn is_wrapper(message: &str) -> bool {
    let lowered = message.trim().trim_end_matches('.').to_lowercase();
    WRAPPER_MESSAGES.iter().any(|w| lowered == *w)
}

fn from_object(obj: &serde_json::Map<String, Value>, depth: u8) -> StructuredError {
    let mut out = StructuredError {
        message: field(obj, &["shortMessage", "message"]),
        code: field(obj, &["code"]),
        reason: field(obj, &["reason"]),
        details: obj.get("data").cloned(),
    };
    // Providers nest the useful part under `error` or `data`
    if depth < 3 {
        for nested_key in ["error", "data", "cause"] {
            if let Some(Value::Object(nested)) = obj.get(nested_key) {
                let inner = from_object(nested, depth + 1);
                let wrapped = out.message.as_deref().map_or(true, is_wrapper);
                if wrapped && inner.message.is_some() {
                    out.message = inner.message;
                }
                if out.code.is_none() {
                    out.code = inner.code;
                }
                if out.reason.is_none() {
                    out.reason = inner.reason;
                }
            }
        }
    }
    out
}

impl From<Value> for RawError {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawError::Unknown,
            Value::String(s) => RawError::Message(s),
            Value::Object(obj) => {
                let structured = from_object(&obj, 0);
                if structured.message.is_none()
                    && structured.code.is_none()
                    && structured.reason.is_none()
                {
                    RawError::Message(Value::Object(obj).to_string())
                } else {
                    RawError::Structured(structured)
                }
            }
            other => RawError::Message(other.to_string()),
        }
    }
}

impl From<&str> for RawError {
    fn from(text: &str) -> Self {
        RawError::Message(text.to_string())
    }
}

impl From<String> for RawError {
    fn from(text: String) -> Self {
        RawError::Message(text)
    }
}

impl From<anyhow::Error> for RawError {
    fn from(err: anyhow::Error) -> Self {
        RawError::Message(format!("{err:#}"))
    }
}
