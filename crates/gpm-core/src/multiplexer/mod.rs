//! The request multiplexer: fan-out, first-wins selection, error accounting,
//! timeout, and cancellation.
//!
//! Each inbound request gets one [`Multiplexer`]. [`Multiplexer::run`] spawns
//! `N` concurrent outbound attempts (attempt 1 goes direct, attempts 2..N
//! each draw a random endpoint from the proxy pool) and a single selection
//! loop races three event sources:
//!
//! - the buffered response channel: the first 2xx commits
//!   [`Outcome::Success`] and the body is handed to the caller still open;
//! - the error channel: counted attempt errors accumulate, and once every
//!   attempt has reported one the run commits [`Outcome::AllErrored`];
//! - a single-shot deadline one second past the per-attempt budget, which
//!   commits [`Outcome::TimedOut`]. The padding lets attempt-level deadlines
//!   surface first.
//!
//! Committing cancels the multiplexer's cancellation scope, which doubles as
//! the done signal: attempts select on it, drop their in-flight request
//! future, and exit. Responses that lose the race are dropped, which closes
//! their bodies: either by the attempt after it observes the committed flag,
//! or when the channels are released at the end of the run.
//!
//! The response channel is buffered to the fan-out width so a losing attempt
//! that races past the committed check can still hand its response over
//! without blocking. Sends after the coordinator has returned fail on the
//! closed channel and are ignored.

mod outcome;

pub use outcome::Outcome;

use crate::{
    config::AppConfig,
    upstream::{self, AttemptError, ProxyPool},
};
use futures::FutureExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Slack past the per-attempt deadline before the run itself gives up.
const TIMEOUT_PADDING: Duration = Duration::from_secs(1);

/// Configuration for a multiplexer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplexerConfig {
    /// Number of concurrent outbound attempts (default: 3).
    #[serde(default = "default_concurrent_tries")]
    pub concurrent_tries: usize,

    /// Wall-clock budget in seconds (default: 10).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_concurrent_tries() -> usize {
    3
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            concurrent_tries: default_concurrent_tries(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl MultiplexerConfig {
    /// Returns the wall-clock budget as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl From<&AppConfig> for MultiplexerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrent_tries: config.concurrent_tries,
            timeout_seconds: config.max_timeout,
        }
    }
}

/// Per-request coordinator racing `N` outbound attempts to the first 2xx.
pub struct Multiplexer {
    pool: Arc<ProxyPool>,
    config: MultiplexerConfig,
    session: u64,
    cancel: CancellationToken,
    committed: Arc<AtomicBool>,
}

impl Multiplexer {
    /// Creates a multiplexer with a fresh cancellation scope.
    #[must_use]
    pub fn new(pool: Arc<ProxyPool>, config: MultiplexerConfig, session: u64) -> Self {
        Self {
            pool,
            config,
            session,
            cancel: CancellationToken::new(),
            committed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a multiplexer whose scope is derived from an inbound scope,
    /// so cancelling the parent cancels every outbound attempt.
    #[must_use]
    pub fn with_parent(
        parent: &CancellationToken,
        pool: Arc<ProxyPool>,
        config: MultiplexerConfig,
        session: u64,
    ) -> Self {
        Self {
            pool,
            config,
            session,
            cancel: parent.child_token(),
            committed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` once the run has committed or the scope was cancelled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.committed.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    /// Cancels the multiplexer's scope, releasing every attempt. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Launches the fan-out and returns the single terminal [`Outcome`].
    ///
    /// The caller owns the response inside [`Outcome::Success`]; dropping or
    /// consuming it releases the body.
    pub async fn run(&self, url: &str, method: Method) -> Outcome {
        let started = Instant::now();
        let tries = self.config.concurrent_tries.max(1);

        let (response_tx, mut response_rx) = mpsc::channel::<reqwest::Response>(tries);
        let (error_tx, mut error_rx) = mpsc::channel::<AttemptError>(1);

        for index in 1..=tries {
            let attempt = Attempt {
                index,
                session: self.session,
                url: url.to_string(),
                method: method.clone(),
                endpoint: if index == 1 { None } else { self.draw_endpoint() },
                timeout: self.config.timeout(),
                cancel: self.cancel.clone(),
                committed: Arc::clone(&self.committed),
                response_tx: response_tx.clone(),
                error_tx: error_tx.clone(),
            };
            tokio::spawn(attempt.run_guarded());
        }
        drop(response_tx);
        drop(error_tx);

        let deadline = tokio::time::sleep_until(started + self.config.timeout() + TIMEOUT_PADDING);
        tokio::pin!(deadline);

        let mut errors: Vec<AttemptError> = Vec::with_capacity(tries);

        loop {
            tokio::select! {
                Some(response) = response_rx.recv() => {
                    let elapsed = started.elapsed();
                    self.commit(&errors);
                    debug!(
                        session = self.session,
                        status = response.status().as_u16(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "first response selected"
                    );
                    return Outcome::Success { response, elapsed };
                }
                Some(err) = error_rx.recv() => {
                    warn!(session = self.session, error = %err, "attempt failed");
                    errors.push(err);
                    if errors.len() >= tries {
                        let elapsed = started.elapsed();
                        self.commit(&errors);
                        let errors_seen = errors.len();
                        let first_error = errors
                            .into_iter()
                            .next()
                            .expect("at least one attempt error was recorded");
                        return Outcome::AllErrored { first_error, errors: errors_seen, elapsed };
                    }
                }
                () = &mut deadline => {
                    let elapsed = started.elapsed();
                    self.commit(&errors);
                    return Outcome::TimedOut { timeout: self.config.timeout(), elapsed };
                }
            }
        }
    }

    /// Commits the terminal state: sets the done flag and cancels the scope,
    /// which tells every attempt to drop its in-flight request and exit.
    fn commit(&self, errors: &[AttemptError]) {
        self.committed.store(true, Ordering::SeqCst);
        self.cancel.cancel();

        if !errors.is_empty() {
            debug!(
                session = self.session,
                errors = ?errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "attempt errors recorded"
            );
        }
    }

    fn draw_endpoint(&self) -> Option<String> {
        match self.pool.rand() {
            Some(endpoint) => Some(endpoint.to_string()),
            None => {
                warn!(
                    session = self.session,
                    "proxy pool is empty, attempt falls back to a direct connection"
                );
                None
            }
        }
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        // Ties attempt lifetimes to the inbound request: if the handler
        // future is dropped mid-run, every attempt is cancelled.
        self.cancel.cancel();
    }
}

/// One outbound call within a fan-out.
struct Attempt {
    index: usize,
    session: u64,
    url: String,
    method: Method,
    endpoint: Option<String>,
    timeout: Duration,
    cancel: CancellationToken,
    committed: Arc<AtomicBool>,
    response_tx: mpsc::Sender<reqwest::Response>,
    error_tx: mpsc::Sender<AttemptError>,
}

impl Attempt {
    /// Runs the attempt with panic isolation: a panicking attempt is reported
    /// as an attempt error instead of being lost with its task.
    async fn run_guarded(self) {
        let session = self.session;
        let index = self.index;
        let error_tx = self.error_tx.clone();

        if let Err(panic) = AssertUnwindSafe(self.run()).catch_unwind().await {
            let message = panic_message(panic.as_ref());
            warn!(session, index, panic = %message, "attempt panicked");
            let _ = error_tx.send(AttemptError::Panicked(message)).await;
        }
    }

    async fn run(self) {
        let client = match &self.endpoint {
            Some(endpoint) => upstream::proxied_client(endpoint, self.timeout),
            None => upstream::direct_client(self.timeout),
        };
        let client = match client {
            Ok(client) => client,
            Err(err) => {
                let _ = self.error_tx.send(err).await;
                return;
            }
        };

        debug!(
            session = self.session,
            index = self.index,
            proxied = self.endpoint.is_some(),
            "attempt started"
        );

        let cancel = self.cancel.clone();
        let request = client.request(self.method.clone(), self.url.as_str());
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(session = self.session, index = self.index, "attempt cancelled");
            }
            result = request.send() => self.deliver(result).await,
        }
    }

    async fn deliver(self, result: Result<reqwest::Response, reqwest::Error>) {
        match result {
            Ok(response) if response.status().is_success() => {
                if self.committed.load(Ordering::SeqCst) || self.cancel.is_cancelled() {
                    debug!(
                        session = self.session,
                        index = self.index,
                        "response discarded, a sibling already won"
                    );
                    return;
                }
                // Channel capacity matches the fan-out width, so this never
                // blocks; a send after commit fails on the closed channel.
                let _ = self.response_tx.send(response).await;
            }
            Ok(response) => {
                let status = response.status().as_u16();
                drop(response);
                let _ = self
                    .error_tx
                    .send(AttemptError::Status { status, url: self.url })
                    .await;
            }
            Err(err) if upstream::is_cancellation(&err) => {
                debug!(
                    session = self.session,
                    index = self.index,
                    error = %err,
                    "attempt cancelled mid-flight"
                );
            }
            Err(err) => {
                let _ = self
                    .error_tx
                    .send(AttemptError::Transport { url: self.url, source: err })
                    .await;
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
