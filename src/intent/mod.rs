//! Intent Gateway: create, observe, capture and cancel payment/setup intents.
//!
//! The workflow only ever *observes* status; it never sets it. Status
//! changes happen at the processor as the reader and cardholder act.

mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use types::{
    last_error, CaptureMethod, CreateIntent, Intent, IntentError, IntentId, IntentKind,
    IntentStatus, PaymentIntentParams, SetupIntentParams,
};

#[async_trait]
pub trait IntentGateway: Send + Sync {
    /// Create exactly one remote intent and return its id.
    ///
    /// A processor rejection is reported as `CheckoutError::Creation`.
    /// Callers must not retry.
    async fn create(&self, request: &CreateIntent) -> Result<IntentId>;

    /// Fetch the current state, dispatching on the id prefix.
    async fn retrieve(&self, id: &IntentId) -> Result<Intent>;

    /// Capture a payment intent. Only valid while it is `requires_capture`.
    async fn capture(&self, id: &IntentId) -> Result<Intent>;

    /// Best-effort cancel. Failures are logged and swallowed.
    async fn cancel(&self, id: &IntentId);
}
