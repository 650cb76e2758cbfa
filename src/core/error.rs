//! Gateway error types
//!
//! Every failure path of `POST /api/gemini` ends in exactly one of these,
//! rendered as `{ "error": "<message>" }` with the matching status code.

use crate::core::constants::message;
use crate::models::proxy::ErrorEnvelope;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or oversized input
    #[error("{0}")]
    InvalidInput(String),

    /// Body over the transport cap
    #[error("{}", message::PAYLOAD_TOO_LARGE)]
    PayloadTooLarge,

    /// No caller-supplied credential
    #[error("{}", message::API_KEY_REQUIRED)]
    MissingCredential,

    /// Upstream overload (503) or network failure on a single attempt
    #[error("{message}")]
    UpstreamTransient {
        status: Option<StatusCode>,
        message: String,
    },

    /// Non-retryable upstream rejection, or transient failure with no attempts left
    #[error("{message}")]
    UpstreamFailure {
        status: Option<StatusCode>,
        message: String,
    },

    /// Anything unexpected. The cause is logged, never returned.
    #[error("{}", message::INTERNAL_ERROR)]
    InternalFault(#[from] anyhow::Error),
}

impl GatewayError {
    /// Whether the retry loop may try again after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::UpstreamTransient { .. })
    }

    /// HTTP status used for the response
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) | GatewayError::MissingCredential => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::UpstreamTransient { status, .. }
            | GatewayError::UpstreamFailure { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            GatewayError::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::InternalFault(cause) = &self {
            error!("Proxy error: {:#}", cause);
        }

        let envelope = ErrorEnvelope {
            error: self.to_string(),
        };
        (self.status_code(), Json(envelope)).into_response()
    }
}
