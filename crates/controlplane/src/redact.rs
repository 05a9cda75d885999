//! Redaction of secrets before anything reaches the diagnostic sink.
//!
//! A key is sensitive when its lower-cased name contains one of
//! [`SENSITIVE_KEYS`], so `api_key`, `X-Api-Key`, `worker_token` and
//! `webhook_secret` all match. Matching values are replaced with
//! [`REDACTED`], recursively through nested objects and arrays.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Replacement written in place of a sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Substrings that mark a key as sensitive.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "secret",
    "key",
    "authorization",
    "credential",
    "cookie",
];

/// `name: value`, `"name": "value"` and `name=value` pairs in free text.
static PAIR_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)("?[a-z0-9_\-]*(?:password|passwd|token|secret|key|authorization|credential|cookie)[a-z0-9_\-]*"?\s*[:=]\s*)("[^"]*"|[^\s,&}"]+)"#).ok()
});

/// Bearer credentials in free text.
static BEARER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(bearer\s+)[a-z0-9._~+/=\-]+").ok());

/// Whether a key names a secret.
#[must_use]
pub fn is_sensitive(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lower.contains(k))
}

/// Redact a JSON document.
#[must_use]
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted: Map<String, Value> = map
                .iter()
                .map(|(k, v)| {
                    let v = if is_sensitive(k) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_json(v)
                    };
                    (k.clone(), v)
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// Redact header values whose names are sensitive.
#[must_use]
pub fn redact_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive(name) {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

/// Redact sensitive query parameters in a URL.
#[must_use]
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if is_sensitive(name) => format!("{name}={REDACTED}"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", params.join("&"))
}

/// Redact a body of unknown format.
///
/// JSON bodies are redacted structurally; anything else falls back to
/// pattern matching on `name: value` pairs and bearer credentials.
#[must_use]
pub fn redact_text(text: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return redact_json(&value).to_string();
    }
    let (Some(pair), Some(bearer)) = (PAIR_RE.as_ref(), BEARER_RE.as_ref()) else {
        return REDACTED.to_string();
    };
    let text = bearer.replace_all(text, format!("${{1}}{REDACTED}"));
    pair.replace_all(&text, format!("${{1}}{REDACTED}"))
        .into_owned()
}
