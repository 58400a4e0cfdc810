//! Input sanitization against HTML/script injection.
//!
//! This is a single-pass textual filter, not an HTML parser. Nested or
//! obfuscated payloads (e.g. `jajavascript:vascript:`) can survive it.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static JAVASCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").unwrap());

/// Inline event handler attributes such as `onclick=`.
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)on\w+=").unwrap());

/// Strip angle brackets, `javascript:` and `on*=` attributes, then trim.
pub fn sanitize(text: &str) -> String {
    let without_brackets: String = text.chars().filter(|c| *c != '<' && *c != '>').collect();
    let without_scheme = JAVASCRIPT_SCHEME.replace_all(&without_brackets, "");
    let without_handlers = EVENT_HANDLER.replace_all(&without_scheme, "");
    without_handlers.trim().to_string()
}

/// Sanitize a JSON value; anything that isn't a string becomes empty.
pub fn sanitize_value(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize(s),
        _ => String::new(),
    }
}
