use crate::upstream::AttemptError;
use std::time::Duration;

/// Terminal value delivered by a multiplexer run, exactly one per session.
#[derive(Debug)]
pub enum Outcome {
    /// A 2xx upstream response won the race. The body is still open and is
    /// owned by the caller, who must consume or drop it.
    Success {
        response: reqwest::Response,
        elapsed: Duration,
    },

    /// Every attempt reported a counted error before any success.
    ///
    /// `first_error` is the first error recorded, reported as representative;
    /// `errors` is the total count.
    AllErrored {
        first_error: AttemptError,
        errors: usize,
        elapsed: Duration,
    },

    /// The wall-clock budget ran out before any success.
    TimedOut { timeout: Duration, elapsed: Duration },
}

impl Outcome {
    /// Returns `true` for the [`Success`](Self::Success) variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Time between the start of the run and the commit.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. }
            | Self::AllErrored { elapsed, .. }
            | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// Text reported to the client on the non-success paths.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::AllErrored { first_error, .. } => Some(first_error.to_string()),
            Self::TimedOut { timeout, .. } => Some(format!(
                "all requests timed out after {:.3} seconds",
                timeout.as_secs_f64()
            )),
        }
    }
}
