use crate::{error::GatewayError, params, router::GatewayState};
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

/// Axum middleware validating the `api_key` query parameter.
///
/// A gateway configured without a key lets every request through. Otherwise
/// the parameter must match the configured key exactly.
///
/// # Errors
///
/// Returns 401 `API key is missing` when the parameter is absent or empty and
/// 401 `API key is invalid` on a mismatch.
pub async fn api_key_middleware(
    State(state): State<Arc<GatewayState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    if state.config.auth_enabled() {
        let query = request.uri().query().unwrap_or_default();
        let api_key = params::extract_query_param(query, "api_key")
            .map_err(|_| GatewayError::ApiKeyMissing)?;

        if api_key != state.config.server_api_key {
            warn!("rejected request carrying an invalid api key");
            return Err(GatewayError::ApiKeyInvalid);
        }
    }

    Ok(next.run(request).await)
}
