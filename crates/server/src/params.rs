//! Query-parameter extraction and destination-URL validation.
//!
//! The `url` parameter is accepted in plain or base64-encoded form and must
//! match the URL pattern after an optional decode. The plain form is tried
//! first; base64 is only attempted when the raw value fails the pattern,
//! which is unambiguous because an encoded value never contains a dot and a
//! plain URL with a scheme never strict-decodes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::form_urlencoded;

/// Pattern a forwardable URL must match, before or after base64 decoding.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:http(s)?://)?[\w.-]+(?:\.[\w.-]+)+[\w\-._~:/?#\[\]@!$&'()*+,;=.]+$"#)
        .expect("url pattern is valid")
});

/// Errors raised while resolving query parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// The named parameter is absent from the query string.
    #[error("no [{0}] query param found")]
    NotFound(&'static str),

    /// The named parameter is present but empty.
    #[error("[{0}] query param is empty")]
    Empty(&'static str),

    /// The `url` value matches neither plainly nor after base64 decoding.
    #[error("passed url value does not match a valid url pattern")]
    InvalidUrl,
}

/// Extracts a single query parameter by name.
///
/// # Errors
///
/// Returns [`ParamError::NotFound`] when the parameter is absent and
/// [`ParamError::Empty`] when it carries no value.
pub fn extract_query_param(query: &str, name: &'static str) -> Result<String, ParamError> {
    let value = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .ok_or(ParamError::NotFound(name))?;

    if value.is_empty() {
        return Err(ParamError::Empty(name));
    }

    Ok(value)
}

/// Resolves the destination URL from the inbound query string.
///
/// # Errors
///
/// Returns [`ParamError::InvalidUrl`] when the value matches the URL pattern
/// neither plainly nor after a strict base64 decode, and the extraction
/// errors of [`extract_query_param`] when the parameter is absent or empty.
pub fn parse_url_param(query: &str) -> Result<String, ParamError> {
    let raw = extract_query_param(query, "url")?;

    if URL_PATTERN.is_match(&raw) {
        return Ok(raw);
    }

    if let Ok(decoded) = BASE64.decode(raw.as_bytes()) {
        if let Ok(decoded) = String::from_utf8(decoded) {
            if URL_PATTERN.is_match(&decoded) {
                return Ok(decoded);
            }
        }
    }

    Err(ParamError::InvalidUrl)
}
