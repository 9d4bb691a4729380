//! Device Action Client: pushes work to a card reader through the relay.
//!
//! Every call is a single request. Nothing is retried and nothing is
//! idempotent, so the caller decides when (and whether) to call again.

mod client;
mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use client::{RelayClient, RequestSigner, SignatureHeader};
pub use types::{
    Cart, LineItem, ListReadersPayload, ProcessPaymentIntentParams, ProcessPaymentIntentPayload,
    ProcessSetupIntentParams, ProcessSetupIntentPayload, Reader, ReaderDisplayParams,
    ReaderListParams, ReaderPayload, ReaderStatus, RelayRequest, SessionContext,
    SetDisplayPayload,
};

/// Relay endpoint names. Shared by the client and the relay router.
pub mod endpoint {
    pub const SET_DISPLAY: &str = "set_display";
    pub const LIST_READERS: &str = "list_readers";
    pub const CANCEL_ACTION: &str = "cancel_action";
    pub const PROCESS_SETUP_INTENT: &str = "process_setup_intent";
    pub const PROCESS_PAYMENT_INTENT: &str = "process_payment_intent";
    pub const SIMULATE_PRESENT_PAYMENT_METHOD: &str = "simulate_present_payment_method";
}

#[async_trait]
pub trait DeviceActions: Send + Sync {
    async fn set_display(&self, reader: &str, params: &ReaderDisplayParams) -> Result<Value>;

    async fn list_readers(&self, filter: &ReaderListParams) -> Result<Vec<Reader>>;

    async fn cancel_action(&self, reader: &str) -> Result<Value>;

    async fn process_setup_intent(
        &self,
        reader: &str,
        params: &ProcessSetupIntentParams,
    ) -> Result<Value>;

    async fn process_payment_intent(
        &self,
        reader: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value>;

    /// Test helper: only works on simulated readers.
    async fn simulate_present_payment_method(&self, reader: &str) -> Result<Value>;
}
