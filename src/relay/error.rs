//! Errors raised by the relay service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::error::CheckoutError;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Forwarding to the processor failed.
    #[error(transparent)]
    Upstream(#[from] CheckoutError),

    #[error("Invalid bind address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Failed to bind relay on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Relay server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("bind() must be called before run()")]
    NotBound,
}

impl RelayError {
    pub fn error_type(&self) -> &'static str {
        match self {
            RelayError::Upstream(err) => err.error_type(),
            RelayError::InvalidAddress { .. } => "invalid_address",
            RelayError::Bind { .. } => "bind_error",
            RelayError::Serve(_) => "serve_error",
            RelayError::NotBound => "not_bound",
        }
    }
}

/// Handler failures become `500` with the error text as a plain body,
/// which the relay client reports as an API error.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::warn!(error_type = self.error_type(), error = %self, "Relay request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
