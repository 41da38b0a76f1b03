//! Parse the raw text returned by an extraction service.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{OrderMatchError, Result};

use super::schema;

/// A ```` ```json ```` fenced block anywhere in the text.
static FENCED_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fence regex"));

/// How much of an unparsable response is quoted in the error.
const MAX_QUOTED_CHARS: usize = 500;

/// Strip a fenced JSON block if present, otherwise return the text as is.
pub fn extract_json(raw: &str) -> &str {
    FENCED_JSON_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str())
}

/// Parse and validate a model response.
///
/// Empty or whitespace-only text is [`OrderMatchError::EmptyResponse`].
/// Text that is not JSON, or JSON that does not conform to the order
/// schema, is [`OrderMatchError::SchemaViolation`].
pub fn parse_response(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(OrderMatchError::EmptyResponse);
    }
    let body = extract_json(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        let quoted: String = raw.chars().take(MAX_QUOTED_CHARS).collect();
        OrderMatchError::SchemaViolation(format!("JSON parsing failed ({e}): {quoted}"))
    })?;
    schema::validate(&value)?;
    Ok(value)
}
