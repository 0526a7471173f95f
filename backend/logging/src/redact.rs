//! Log Redaction Layer
//!
//! Scrubs API tokens, bearer credentials and email addresses from strings
//! and JSON payloads before they reach the log.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)|(?i)(api[_-]?token=[^&\s]+)")
        .expect("token pattern is valid")
});
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email pattern is valid"));

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TOKEN_RE.replace_all(input, "[REDACTED_TOKEN]");
    EMAIL_RE.replace_all(&redacted, "[REDACTED_EMAIL]").into_owned()
}

/// Redacts every string inside a JSON value, keys included.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (redact_sensitive_data(k), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
