use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::intent::CaptureMethod;

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

/// Caller identity attached to every relay call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Dashboard user the session acts for (e.g., "usr_123").
    #[serde(default)]
    pub user_id: String,
    /// Connected account that owns the readers (e.g., "acct_123").
    #[serde(default)]
    pub account_id: String,
    /// Customer attached to created intents.
    #[serde(default)]
    pub customer: Option<String>,
}

/// Relay service settings, used by both the client and the server side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL the client posts terminal actions to.
    #[serde(default = "default_relay_base_url")]
    pub base_url: String,
    /// Bind address for `terminal-checkout relay` (host:port).
    #[serde(default = "default_relay_bind_addr")]
    pub bind_addr: String,
    /// Opaque signature value sent as the `stripe-signature` header.
    #[serde(default)]
    pub signature: Option<String>,
}

/// Payment processor REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Base URL for the processor API (e.g., "https://api.stripe.com").
    #[serde(default = "default_processor_base_url")]
    pub base_url: String,
    /// Secret API key. Falls back to `$STRIPE_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Workflow timing and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Interval between intent status checks (default: 5).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Overall deadline for a charging intent (default: 90).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Max readers requested when loading (default: 5).
    #[serde(default = "default_reader_limit")]
    pub reader_limit: u32,
    /// Currency for payment intents (default: "usd").
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Initial payment amount in minor units (default: 100).
    #[serde(default = "default_amount")]
    pub default_amount: u64,
    /// `manual` leaves payments in `requires_capture` for the session to
    /// capture (default: "automatic").
    #[serde(default = "default_capture_method")]
    pub capture_method: CaptureMethod,
    /// Connection timeout for outbound calls in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Total timeout for a single outbound call in seconds (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl CheckoutConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_relay_base_url() -> String {
    "http://127.0.0.1:4242".to_string()
}

fn default_relay_bind_addr() -> String {
    "127.0.0.1:4242".to_string()
}

fn default_processor_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    90
}

fn default_reader_limit() -> u32 {
    5
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_capture_method() -> CaptureMethod {
    CaptureMethod::Automatic
}

fn default_amount() -> u64 {
    100
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: default_relay_base_url(),
            bind_addr: default_relay_bind_addr(),
            signature: None,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            base_url: default_processor_base_url(),
            api_key: None,
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            timeout_seconds: default_timeout(),
            reader_limit: default_reader_limit(),
            currency: default_currency(),
            default_amount: default_amount(),
            capture_method: default_capture_method(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}
