//! Inbound frame parsing
//!
//! Every event payload is JSON with exactly one string field, either
//! `error` or `context`. Anything else is unrecognized and must not end the
//! stream.

use serde::Deserialize;

/// A parsed stream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Backend reported a failure for this request
    Error(String),
    /// Next piece of the assistant's answer
    Context(String),
    /// Payload did not match a known shape; carries a short description
    Unrecognized(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ErrorPayload {
    error: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ContextPayload {
    context: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Error(ErrorPayload),
    Context(ContextPayload),
}

impl Frame {
    pub fn parse(raw: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return Frame::Unrecognized(format!("malformed frame: {e}")),
        };

        // Struct visitors also accept sequences; only objects can match
        if !value.is_object() {
            return Frame::Unrecognized("unrecognized frame shape".to_string());
        }

        match serde_json::from_value::<Payload>(value) {
            Ok(Payload::Error(p)) => Frame::Error(p.error),
            Ok(Payload::Context(p)) => Frame::Context(p.context),
            Err(_) => Frame::Unrecognized("unrecognized frame shape".to_string()),
        }
    }
}
