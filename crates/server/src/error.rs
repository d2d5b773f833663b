use crate::params::ParamError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Boundary errors translated into HTTP responses.
///
/// Bodies are plain text because the wire contract fixes the exact strings
/// clients observe.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad request parsing or validation; never reaches the core.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// Authentication is required and no key was supplied.
    #[error("API key is missing")]
    ApiKeyMissing,

    /// Authentication is required and the supplied key does not match.
    #[error("API key is invalid")]
    ApiKeyInvalid,
}

impl GatewayError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Param(_) => StatusCode::BAD_REQUEST,
            Self::ApiKeyMissing | Self::ApiKeyInvalid => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
