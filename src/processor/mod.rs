//! HTTP client for the payment processor's REST API.
//!
//! Covers the two intent kinds and the terminal reader endpoints. The
//! relay service fronts the reader half; the workflow uses the intent
//! half through [`IntentGateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{CheckoutConfig, CredentialStatus, ProcessorConfig, SecureString};
use crate::error::{CheckoutError, Result};
use crate::intent::{CreateIntent, Intent, IntentGateway, IntentId, IntentKind};
use crate::terminal::{
    DeviceActions, ProcessPaymentIntentParams, ProcessSetupIntentParams, Reader,
    ReaderDisplayParams, ReaderListParams,
};

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Clone)]
pub struct ProcessorClient {
    client: Client,
    base_url: String,
    secret_key: SecureString,
}

impl ProcessorClient {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: SecureString,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .expect("Failed to build processor client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    /// Build from config, resolving the secret key.
    pub fn from_config(processor: &ProcessorConfig, checkout: &CheckoutConfig) -> Result<Self> {
        match processor.resolve_credential() {
            CredentialStatus::Configured(key) => Ok(Self::new(
                processor.base_url.clone(),
                key,
                checkout.connect_timeout(),
                checkout.request_timeout(),
            )),
            CredentialStatus::Unconfigured { reason } => {
                Err(CheckoutError::NotConfigured { reason })
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(self.secret_key.expose(), None::<&str>)
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(|e| CheckoutError::Transport {
            endpoint: endpoint.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = status.as_u16(), "Processor rejected request");
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| CheckoutError::Decode {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T> {
        self.send(endpoint, self.request(Method::POST, path).form(form))
            .await
    }

    fn intent_path(id: &IntentId) -> Result<String> {
        let kind = id.kind().ok_or_else(|| CheckoutError::UnknownIntent {
            id: id.to_string(),
        })?;
        Ok(format!("/v1/{}/{}", kind.collection(), id))
    }

    // -- Terminal readers -----------------------------------------------------

    pub async fn list_readers(&self, params: &ReaderListParams) -> Result<Vec<Reader>> {
        let mut query = vec![("limit", params.limit.to_string())];
        if let Some(status) = params.status {
            query.push(("status", status.as_str().to_string()));
        }
        let list: ListResponse<Reader> = self
            .send(
                "list_readers",
                self.request(Method::GET, "/v1/terminal/readers").query(&query),
            )
            .await?;
        Ok(list.data)
    }

    pub async fn set_reader_display(
        &self,
        reader: &str,
        params: &ReaderDisplayParams,
    ) -> Result<Value> {
        self.post_form(
            "set_display",
            &format!("/v1/terminal/readers/{}/set_reader_display", reader),
            &params.to_form(),
        )
        .await
    }

    pub async fn cancel_reader_action(&self, reader: &str) -> Result<Value> {
        self.post_form(
            "cancel_action",
            &format!("/v1/terminal/readers/{}/cancel_action", reader),
            &[],
        )
        .await
    }

    pub async fn process_setup_intent(
        &self,
        reader: &str,
        params: &ProcessSetupIntentParams,
    ) -> Result<Value> {
        let form = vec![
            ("setup_intent".to_string(), params.setup_intent.clone()),
            (
                "customer_consent_collected".to_string(),
                params.customer_consent_collected.to_string(),
            ),
        ];
        self.post_form(
            "process_setup_intent",
            &format!("/v1/terminal/readers/{}/process_setup_intent", reader),
            &form,
        )
        .await
    }

    pub async fn process_payment_intent(
        &self,
        reader: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value> {
        let form = vec![("payment_intent".to_string(), params.payment_intent.clone())];
        self.post_form(
            "process_payment_intent",
            &format!("/v1/terminal/readers/{}/process_payment_intent", reader),
            &form,
        )
        .await
    }

    pub async fn present_payment_method(&self, reader: &str) -> Result<Value> {
        self.post_form(
            "simulate_present_payment_method",
            &format!(
                "/v1/test_helpers/terminal/readers/{}/present_payment_method",
                reader
            ),
            &[],
        )
        .await
    }

    // -- Intents ----------------------------------------------------------------

    async fn try_cancel(&self, id: &IntentId) -> Result<Intent> {
        let path = format!("{}/cancel", Self::intent_path(id)?);
        self.post_form("cancel_intent", &path, &[]).await
    }
}

#[async_trait]
impl IntentGateway for ProcessorClient {
    async fn create(&self, request: &CreateIntent) -> Result<IntentId> {
        let kind = request.kind();
        let builder = self
            .request(Method::POST, &format!("/v1/{}", kind.collection()))
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .form(&request.to_form());

        let created: CreatedObject = self
            .send("create_intent", builder)
            .await
            .map_err(|err| match err {
                CheckoutError::Api { message, .. } => CheckoutError::Creation { kind, message },
                other => other,
            })?;

        tracing::info!(intent_id = %created.id, %kind, "Intent created");
        Ok(IntentId::new(created.id))
    }

    async fn retrieve(&self, id: &IntentId) -> Result<Intent> {
        let path = Self::intent_path(id)?;
        self.send("retrieve_intent", self.request(Method::GET, &path))
            .await
    }

    async fn capture(&self, id: &IntentId) -> Result<Intent> {
        if id.kind() != Some(IntentKind::Payment) {
            return Err(CheckoutError::UnknownIntent { id: id.to_string() });
        }
        let path = format!("{}/capture", Self::intent_path(id)?);
        let intent: Intent = self.post_form("capture_intent", &path, &[]).await?;
        tracing::info!(intent_id = %id, status = ?intent.status, "Payment captured");
        Ok(intent)
    }

    async fn cancel(&self, id: &IntentId) {
        match self.try_cancel(id).await {
            Ok(intent) => tracing::info!(intent_id = %id, status = ?intent.status, "Intent canceled"),
            Err(err) => tracing::warn!(
                intent_id = %id,
                error_type = err.error_type(),
                error = %err,
                "Best-effort intent cancel failed"
            ),
        }
    }
}

/// Direct access to the reader endpoints. This is what the relay service
/// forwards to.
#[async_trait]
impl DeviceActions for ProcessorClient {
    async fn set_display(&self, reader: &str, params: &ReaderDisplayParams) -> Result<Value> {
        self.set_reader_display(reader, params).await
    }

    async fn list_readers(&self, filter: &ReaderListParams) -> Result<Vec<Reader>> {
        ProcessorClient::list_readers(self, filter).await
    }

    async fn cancel_action(&self, reader: &str) -> Result<Value> {
        self.cancel_reader_action(reader).await
    }

    async fn process_setup_intent(
        &self,
        reader: &str,
        params: &ProcessSetupIntentParams,
    ) -> Result<Value> {
        ProcessorClient::process_setup_intent(self, reader, params).await
    }

    async fn process_payment_intent(
        &self,
        reader: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value> {
        ProcessorClient::process_payment_intent(self, reader, params).await
    }

    async fn simulate_present_payment_method(&self, reader: &str) -> Result<Value> {
        self.present_payment_method(reader).await
    }
}
