use crate::{error::GatewayError, middleware, params};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use gpm_core::{
    config::AppConfig,
    multiplexer::{Multiplexer, MultiplexerConfig, Outcome},
    upstream::ProxyPool,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};
use tracing::{error, info, warn};

/// Slack the inbound timeout allows past the multiplexer's own deadline, so
/// the core commits its outcome before the connection is cut.
const INBOUND_TIMEOUT_PADDING: Duration = Duration::from_secs(2);

/// Shared state for the gateway routes.
pub struct GatewayState {
    pub config: AppConfig,
    pub pool: Arc<ProxyPool>,
    session: AtomicU64,
}

impl GatewayState {
    #[must_use]
    pub fn new(config: AppConfig, pool: Arc<ProxyPool>) -> Self {
        Self {
            config,
            pool,
            session: AtomicU64::new(0),
        }
    }

    /// Allocates the next session id for log correlation.
    fn next_session(&self) -> u64 {
        self.session.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Builds the gateway router: `/get` behind the API-key check, the inbound
/// timeout, and a panic catcher that turns handler faults into 500s;
/// `/health` public.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let inbound_timeout = state.config.timeout() + INBOUND_TIMEOUT_PADDING;

    Router::new()
        .route("/get", get(handle_get))
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::api_key_middleware,
        ))
        .layer(TimeoutLayer::new(inbound_timeout))
        .layer(CatchPanicLayer::new())
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Handles `GET /get`: resolves the destination URL, fans the request out
/// through a fresh multiplexer, and copies the first response back.
pub async fn handle_get(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let query = request.uri().query().unwrap_or_default();
    let destination = match params::parse_url_param(query) {
        Ok(url) => url,
        Err(err) => return GatewayError::from(err).into_response(),
    };

    let session = state.next_session();
    info!(session, url = %destination, "forwarding request");

    let multiplexer = Multiplexer::new(
        Arc::clone(&state.pool),
        MultiplexerConfig::from(&state.config),
        session,
    );

    match multiplexer.run(&destination, Method::GET).await {
        Outcome::Success { response, elapsed } => {
            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ms = elapsed.as_millis() as u64;
            info!(
                session,
                status = response.status().as_u16(),
                elapsed_ms,
                "first response delivered"
            );
            proxy_response(response)
        }
        outcome => {
            let message = outcome.error_message().unwrap_or_default();
            warn!(session, error = %message, "no response delivered");
            (StatusCode::BAD_GATEWAY, message).into_response()
        }
    }
}

/// Copies status and headers from the winning upstream response and streams
/// its body through. `Content-Length` is recomputed by the outbound writer
/// and `Transfer-Encoding` is re-framed, so neither is copied.
fn proxy_response(upstream: reqwest::Response) -> Response {
    let mut builder = Response::builder().status(upstream.status());

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in upstream.headers() {
            if name == header::CONTENT_LENGTH || name == header::TRANSFER_ENCODING {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
    }

    match builder.body(Body::from_stream(upstream.bytes_stream())) {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "failed to assemble proxied response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error occurred".to_string(),
            )
                .into_response()
        }
    }
}

/// Reports gateway liveness and the size of the loaded proxy pool.
pub async fn handle_health(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "ok",
        "proxies": state.pool.count(),
    });

    (
        StatusCode::OK,
        [("content-type", "application/json")],
        health.to_string(),
    )
}
