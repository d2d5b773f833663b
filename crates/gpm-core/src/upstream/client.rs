//! Per-attempt HTTP client construction.
//!
//! Each outbound attempt gets its own single-use client so that cancelling
//! one attempt cannot disturb its siblings. TLS peer verification is
//! disabled: the gateway forwards whatever the upstream returns and
//! certificate validity is not its concern.

use super::errors::AttemptError;
use reqwest::Client;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a client with no proxy for the direct attempt.
///
/// # Errors
///
/// Returns [`AttemptError::Client`] if the underlying reqwest client fails to
/// build.
pub fn direct_client(timeout: Duration) -> Result<Client, AttemptError> {
    builder(timeout).no_proxy().build().map_err(AttemptError::Client)
}

/// Builds a client routed through the given HTTP proxy endpoint.
///
/// # Errors
///
/// Returns [`AttemptError::Client`] if the endpoint is not a usable proxy URL
/// or the client fails to build.
pub fn proxied_client(endpoint: &str, timeout: Duration) -> Result<Client, AttemptError> {
    let proxy = reqwest::Proxy::all(endpoint).map_err(AttemptError::Client)?;
    builder(timeout).proxy(proxy).build().map_err(AttemptError::Client)
}

fn builder(timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
}
