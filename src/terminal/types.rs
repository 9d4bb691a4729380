use serde::{Deserialize, Serialize};

/// Card reader snapshot as reported by the processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// e.g. `bbpos_wisepos_e`, `simulated_wisepos_e`.
    pub device_type: String,
    #[serde(default)]
    pub status: Option<ReaderStatus>,
    #[serde(default)]
    pub serial_number: Option<String>,
}

impl Reader {
    /// Simulated readers accept the present-payment-method test helper.
    pub fn is_simulated(&self) -> bool {
        self.device_type.starts_with("simulated_")
    }

    /// Label if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderStatus {
    Online,
    Offline,
}

impl ReaderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderStatus::Online => "online",
            ReaderStatus::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderListParams {
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReaderStatus>,
}

impl ReaderListParams {
    pub fn online(limit: u32) -> Self {
        Self {
            limit,
            status: Some(ReaderStatus::Online),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    /// Minor units.
    pub amount: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub currency: String,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub tax: Option<u64>,
    pub total: u64,
}

/// What to show on the reader screen. Only carts are supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderDisplayParams {
    #[serde(rename = "type")]
    pub display_type: String,
    pub cart: Cart,
}

impl ReaderDisplayParams {
    /// A cart whose total is the sum of its lines plus tax.
    pub fn cart(currency: &str, line_items: Vec<LineItem>, tax: Option<u64>) -> Self {
        let subtotal: u64 = line_items
            .iter()
            .map(|item| item.amount * u64::from(item.quantity))
            .sum();
        Self {
            display_type: "cart".to_string(),
            cart: Cart {
                currency: currency.to_string(),
                total: subtotal + tax.unwrap_or(0),
                line_items,
                tax,
            },
        }
    }

    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("type".to_string(), self.display_type.clone()),
            ("cart[currency]".to_string(), self.cart.currency.clone()),
            ("cart[total]".to_string(), self.cart.total.to_string()),
        ];
        if let Some(tax) = self.cart.tax {
            form.push(("cart[tax]".to_string(), tax.to_string()));
        }
        for (i, item) in self.cart.line_items.iter().enumerate() {
            form.push((
                format!("cart[line_items][{}][description]", i),
                item.description.clone(),
            ));
            form.push((format!("cart[line_items][{}][amount]", i), item.amount.to_string()));
            form.push((
                format!("cart[line_items][{}][quantity]", i),
                item.quantity.to_string(),
            ));
        }
        form
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPaymentIntentParams {
    pub payment_intent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSetupIntentParams {
    pub setup_intent: String,
    pub customer_consent_collected: bool,
}

/// Who is calling: sent with every relay request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub account_id: String,
}

/// Envelope posted to every relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest<P> {
    pub user_id: String,
    pub account_id: String,
    pub payload: P,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDisplayPayload {
    pub reader: String,
    pub reader_display_params: ReaderDisplayParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReadersPayload {
    pub reader_list_params: ReaderListParams,
}

/// Payload for the endpoints that only name a reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderPayload {
    pub reader: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSetupIntentPayload {
    pub reader: String,
    pub process_setup_intent_params: ProcessSetupIntentParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentIntentPayload {
    pub reader: String,
    pub process_payment_intent_params: ProcessPaymentIntentParams,
}
