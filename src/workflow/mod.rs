//! Workflow State Machine for one checkout session.
//!
//! ```text
//! loading → loading-readers → ready → charging → payment-collected
//!                 │             │        │     → payment-method-collected
//!                 └──── error ←─┘        └──→ canceling → loading
//! ```
//!
//! [`WorkflowReducer`] decides transitions; [`Session`] runs the effects
//! against a [`DeviceActions`](crate::terminal::DeviceActions) and an
//! [`IntentGateway`](crate::intent::IntentGateway).

mod intent;
mod reducer;
mod runtime;
mod state;

pub use intent::{Effect, UserAction, WorkflowIntent};
pub use reducer::{WorkflowReducer, NO_READERS, NO_READER_SELECTED, READERS_FAILED};
pub use runtime::{Session, SessionClosed, SessionHandle, SessionOptions};
pub use state::{ActiveIntent, Phase, PendingStart, WorkflowSettings, WorkflowState, DEFAULT_AMOUNT};
