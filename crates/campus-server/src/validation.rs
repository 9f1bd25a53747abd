//! Lightweight request-shape checks on the query string.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_KEY_LEN: usize = 100;
const MAX_VALUE_LEN: usize = 1000;

static SCRIPT_INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<script|javascript:|\bon[a-z]+\s*=").expect("static regex")
});

static SQL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(union|select|insert|update|delete|drop|alter|exec)\b")
        .expect("static regex")
});

static SQL_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(from|into|table|set|where)\b|--|;|'").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryViolation {
    #[error("query parameter name too long")]
    KeyTooLong,
    #[error("query parameter value too long")]
    ValueTooLong,
    #[error("suspicious query parameter")]
    Suspicious,
}

/// Reject oversized or injection-looking query parameters. Keys and
/// values are percent-decoded before checking.
pub fn validate_query(query: Option<&str>) -> Result<(), QueryViolation> {
    let Some(query) = query else {
        return Ok(());
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(raw_key);
        let value = decode(raw_value);

        if key.chars().count() > MAX_KEY_LEN {
            return Err(QueryViolation::KeyTooLong);
        }
        if value.chars().count() > MAX_VALUE_LEN {
            return Err(QueryViolation::ValueTooLong);
        }
        if is_suspicious(&key) || is_suspicious(&value) || is_sql(&format!("{key}={value}")) {
            return Err(QueryViolation::Suspicious);
        }
    }
    Ok(())
}

fn decode(raw: &str) -> Cow<'_, str> {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        // Not UTF-8 after decoding: check the text as sent.
        Err(_) => Cow::Borrowed(raw),
    }
}

// Script patterns are matched per part so a key like `onion` followed
// by `=` is not read as an inline handler. SQL is also matched across
// the joined pair.
fn is_suspicious(text: &str) -> bool {
    SCRIPT_INJECTION.is_match(text) || is_sql(text)
}

fn is_sql(text: &str) -> bool {
    SQL_KEYWORD.is_match(text) && SQL_SYNTAX.is_match(text)
}
