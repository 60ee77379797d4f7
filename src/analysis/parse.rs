//! Recovery of a JSON object from model output
//!
//! Models asked for JSON still wrap it in code fences, prefix it with
//! "Sure! Here's the result:", or append a sign-off. The parser tries, in
//! order:
//!
//! 1. the reply as-is, when the upstream already returned a structured document
//! 2. the text with surrounding code fences stripped
//! 3. a brace-depth scan for a balanced `{...}` span (string literals and
//!    escapes are honored, so braces inside comments do not confuse it)
//! 4. the span between the first `{` and the last `}`
//!
//! This is best effort. A reply containing several unrelated objects may
//! yield the wrong one; schema validation catches that downstream.

use serde_json::Value;
use thiserror::Error;

/// Upper bound on `{` positions tried by the balanced scan
const MAX_SCAN_CANDIDATES: usize = 16;

/// Raw model output as delivered by the upstream client
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Free-form text, ideally containing a JSON object
    Text(String),
    /// A document the upstream already delivered as structured JSON
    Document(Value),
}

/// Errors produced when no JSON object can be recovered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("model returned an empty response")]
    Empty,

    #[error("model response contains no recoverable JSON object")]
    NoJsonObject,

    #[error("model returned a JSON {0} where an object was expected")]
    NotAnObject(&'static str),
}

/// Recover a JSON object from a model reply
///
/// # Examples
///
/// ```
/// use resume_reviewer::analysis::parse::{ModelReply, parse};
///
/// let reply = ModelReply::Text("Sure! Here you go: {\"a\": 1} Thanks!".to_string());
/// assert_eq!(parse(reply).unwrap()["a"], 1);
/// ```
pub fn parse(reply: ModelReply) -> Result<Value, ParseError> {
    match reply {
        ModelReply::Document(value @ Value::Object(_)) => Ok(value),
        ModelReply::Document(Value::String(text)) => parse_text(&text, true),
        ModelReply::Document(other) => Err(ParseError::NotAnObject(json_kind(&other))),
        ModelReply::Text(text) => parse_text(&text, true),
    }
}

/// Parse the first complete `{...}` span, if there is one
///
/// Used by the streaming reader as its early-exit predicate. Unlike
/// [`parse`] it never falls back to later `{` positions, so a partially
/// received document is not mistaken for one of its own nested objects.
pub fn first_complete_object(text: &str) -> Option<Value> {
    let stripped = strip_code_fence(text);
    let start = stripped.find('{')?;
    let span = balanced_span(stripped, start)?;
    match serde_json::from_str(span) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn parse_text(text: &str, unwrap_encoded: bool) -> Result<Value, ParseError> {
    let stripped = strip_code_fence(text);
    if stripped.is_empty() {
        return Err(ParseError::Empty);
    }

    match serde_json::from_str::<Value>(stripped) {
        Ok(value @ Value::Object(_)) => return Ok(value),
        // A JSON-encoded string holding the document, e.g. "{\"scores\": ...}"
        Ok(Value::String(inner)) if unwrap_encoded => return parse_text(&inner, false),
        _ => {}
    }

    for (start, _) in stripped.match_indices('{').take(MAX_SCAN_CANDIDATES) {
        let Some(span) = balanced_span(stripped, start) else {
            continue;
        };
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
            return Ok(value);
        }
    }

    if let (Some(first), Some(last)) = (stripped.find('{'), stripped.rfind('}')) {
        if first < last {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&stripped[first..=last]) {
                return Ok(value);
            }
        }
    }

    Err(ParseError::NoJsonObject)
}

/// Strip a leading ```` ```lang ```` marker and a trailing ```` ``` ```` marker
fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```") {
        let rest = rest.trim_start_matches('`');
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        s = &rest[tag_len..];
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest.trim_end_matches('`');
    }

    s.trim()
}

/// Find the balanced `{...}` span opening at byte offset `start`
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
