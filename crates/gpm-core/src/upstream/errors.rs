use thiserror::Error;

/// Errors produced by a single outbound attempt.
///
/// Every variant here is *counted* toward the multiplexer's all-errored
/// threshold. Cancellation-induced failures never become an `AttemptError`;
/// they are filtered by [`is_cancellation`] before classification.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Network, DNS, TLS or proxy failure on a single attempt.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-2xx status.
    #[error("error status {status} received from {url}")]
    Status { status: u16, url: String },

    /// The outbound client could not be constructed.
    #[error("failed to build outbound client: {0}")]
    Client(#[source] reqwest::Error),

    /// The attempt task panicked; the panic was caught and converted.
    #[error("attempt panicked: {0}")]
    Panicked(String),
}

/// Returns `true` if a transport error is a self-inflicted consequence of
/// cancellation or of the per-attempt deadline, and must not be counted.
///
/// Structured inspection first: the per-attempt deadline surfaces as
/// [`reqwest::Error::is_timeout`]. The substring scan over the source chain is
/// the fallback for transports that only render cancellation into the error
/// text.
#[must_use]
pub fn is_cancellation(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }

    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        let text = current.to_string();
        if text.contains("canceled") || text.contains("cancelled") || text.contains("context") {
            return true;
        }
        source = current.source();
    }

    false
}
