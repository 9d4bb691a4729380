use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two processor objects an intent is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Payment,
    Setup,
}

impl IntentKind {
    /// Classify an intent id by its prefix (`seti_…` → setup, `pi_…` → payment).
    ///
    /// This is the only place the prefix convention is interpreted.
    pub fn classify(id: &str) -> Option<IntentKind> {
        if id.starts_with("seti") {
            Some(IntentKind::Setup)
        } else if id.starts_with("pi") {
            Some(IntentKind::Payment)
        } else {
            None
        }
    }

    /// Processor object name (`payment_intent` / `setup_intent`).
    pub fn object_name(&self) -> &'static str {
        match self {
            IntentKind::Payment => "payment_intent",
            IntentKind::Setup => "setup_intent",
        }
    }

    /// REST collection path segment.
    pub(crate) fn collection(&self) -> &'static str {
        match self {
            IntentKind::Payment => "payment_intents",
            IntentKind::Setup => "setup_intents",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::Payment => write!(f, "payment"),
            IntentKind::Setup => write!(f, "setup"),
        }
    }
}

/// Processor-assigned intent identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(String);

impl IntentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<IntentKind> {
        IntentKind::classify(&self.0)
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Intent status as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}


/// Error detail attached to an intent after a failed attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Snapshot of a payment or setup intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    /// `payment_intent` or `setup_intent`.
    pub object: String,
    pub status: IntentStatus,
    #[serde(default)]
    pub last_payment_error: Option<IntentError>,
    #[serde(default)]
    pub last_setup_error: Option<IntentError>,
}

impl Intent {
    /// Kind according to the object type the processor reported.
    pub fn kind(&self) -> Option<IntentKind> {
        match self.object.as_str() {
            "payment_intent" => Some(IntentKind::Payment),
            "setup_intent" => Some(IntentKind::Setup),
            _ => None,
        }
    }
}

/// Human-readable message from whichever error field matches the intent's
/// object type, or an empty string.
pub fn last_error(intent: &Intent) -> String {
    let field = match intent.kind() {
        Some(IntentKind::Setup) => intent.last_setup_error.as_ref(),
        Some(IntentKind::Payment) => intent.last_payment_error.as_ref(),
        None => None,
    };
    field
        .and_then(|e| e.message.clone())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    Automatic,
    Manual,
}

impl CaptureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::Automatic => "automatic",
            CaptureMethod::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentParams {
    /// Minor units.
    pub amount: u64,
    pub currency: String,
    pub customer: Option<String>,
    pub capture_method: CaptureMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupIntentParams {
    pub customer: Option<String>,
    /// `off_session` or `on_session`.
    pub usage: String,
}

/// Request to create one intent of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateIntent {
    Payment(PaymentIntentParams),
    Setup(SetupIntentParams),
}

impl CreateIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            CreateIntent::Payment(_) => IntentKind::Payment,
            CreateIntent::Setup(_) => IntentKind::Setup,
        }
    }

    /// Form fields for the processor's create endpoint.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![(
            "payment_method_types[]".to_string(),
            "card_present".to_string(),
        )];
        let customer = match self {
            CreateIntent::Payment(p) => {
                form.push(("amount".to_string(), p.amount.to_string()));
                form.push(("currency".to_string(), p.currency.clone()));
                form.push((
                    "capture_method".to_string(),
                    p.capture_method.as_str().to_string(),
                ));
                &p.customer
            }
            CreateIntent::Setup(s) => {
                form.push(("usage".to_string(), s.usage.clone()));
                &s.customer
            }
        };
        if let Some(customer) = customer {
            form.push(("customer".to_string(), customer.clone()));
        }
        form
    }
}
