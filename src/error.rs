//! Error taxonomy for calls leaving the process.
//!
//! Every failure from the relay or the processor surfaces as a
//! [`CheckoutError`]. Nothing in this crate retries on its own; the
//! workflow maps these into its error state.

use thiserror::Error;

use crate::intent::IntentKind;

pub type Result<T> = std::result::Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request never produced a response (DNS, connect, reset, timeout).
    #[error("An error occurred calling the {endpoint} API: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote side answered with a non-success status.
    /// `message` is the raw response body.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The processor refused to create an intent.
    #[error("Unable to create {kind} intent: {message}")]
    Creation { kind: IntentKind, message: String },

    /// A success response whose body did not match the expected shape.
    #[error("Failed to parse {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Intent id matches neither the setup nor the payment prefix.
    #[error("Unrecognized intent id '{id}'")]
    UnknownIntent { id: String },

    #[error("Processor not configured: {reason}")]
    NotConfigured { reason: String },
}

impl CheckoutError {
    /// Short machine-readable tag, used as a structured log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            CheckoutError::Transport { .. } => "transport_error",
            CheckoutError::Api { .. } => "api_error",
            CheckoutError::Creation { .. } => "creation_error",
            CheckoutError::Decode { .. } => "decode_error",
            CheckoutError::UnknownIntent { .. } => "unknown_intent",
            CheckoutError::NotConfigured { .. } => "not_configured",
        }
    }

    /// HTTP status carried by the failure, if the remote side answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            CheckoutError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
