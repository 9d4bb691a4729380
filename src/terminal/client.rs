use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{CheckoutError, Result};

use super::endpoint;
use super::types::{
    ListReadersPayload, ProcessPaymentIntentParams, ProcessPaymentIntentPayload,
    ProcessSetupIntentParams, ProcessSetupIntentPayload, Reader, ReaderDisplayParams,
    ReaderListParams, ReaderPayload, RelayRequest, SessionContext, SetDisplayPayload,
};
use super::DeviceActions;

/// Produces the identity headers attached to each relay call.
///
/// How the signature is made is not this crate's concern.
pub trait RequestSigner: Send + Sync {
    fn headers(&self, session: &SessionContext) -> Vec<(String, String)>;
}

impl<F> RequestSigner for F
where
    F: Fn(&SessionContext) -> Vec<(String, String)> + Send + Sync,
{
    fn headers(&self, session: &SessionContext) -> Vec<(String, String)> {
        self(session)
    }
}

/// Sends a fixed, pre-computed value as the `stripe-signature` header.
pub struct SignatureHeader(pub Option<String>);

impl RequestSigner for SignatureHeader {
    fn headers(&self, _session: &SessionContext) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|sig| ("stripe-signature".to_string(), sig.clone()))
            .collect()
    }
}

/// [`DeviceActions`] over HTTP to the relay service.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    session: SessionContext,
    signer: Arc<dyn RequestSigner>,
}

impl RelayClient {
    pub fn new(
        base_url: impl Into<String>,
        session: SessionContext,
        signer: Arc<dyn RequestSigner>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .expect("Failed to build relay client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            signer,
        }
    }

    /// Client for the configured relay, signing with the configured value.
    pub fn from_config(config: &Config) -> Self {
        let session = SessionContext {
            user_id: config.session.user_id.clone(),
            account_id: config.session.account_id.clone(),
        };
        Self::new(
            config.relay.base_url.clone(),
            session,
            Arc::new(SignatureHeader(config.relay.signature.clone())),
            config.checkout.connect_timeout(),
            config.checkout.request_timeout(),
        )
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    async fn call<P, T>(&self, endpoint: &str, payload: P) -> Result<T>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = RelayRequest {
            user_id: self.session.user_id.clone(),
            account_id: self.session.account_id.clone(),
            payload,
        };

        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in self.signer.headers(&self.session) {
            builder = builder.header(name, value);
        }

        tracing::debug!(endpoint, "Calling relay");
        let response = builder.json(&body).send().await.map_err(|e| {
            tracing::error!(endpoint, error = %e, "Relay call failed");
            CheckoutError::Transport {
                endpoint: endpoint.to_string(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
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
}

#[async_trait]
impl DeviceActions for RelayClient {
    async fn set_display(&self, reader: &str, params: &ReaderDisplayParams) -> Result<Value> {
        self.call(
            endpoint::SET_DISPLAY,
            SetDisplayPayload {
                reader: reader.to_string(),
                reader_display_params: params.clone(),
            },
        )
        .await
    }

    async fn list_readers(&self, filter: &ReaderListParams) -> Result<Vec<Reader>> {
        self.call(
            endpoint::LIST_READERS,
            ListReadersPayload {
                reader_list_params: filter.clone(),
            },
        )
        .await
    }

    async fn cancel_action(&self, reader: &str) -> Result<Value> {
        self.call(
            endpoint::CANCEL_ACTION,
            ReaderPayload {
                reader: reader.to_string(),
            },
        )
        .await
    }

    async fn process_setup_intent(
        &self,
        reader: &str,
        params: &ProcessSetupIntentParams,
    ) -> Result<Value> {
        self.call(
            endpoint::PROCESS_SETUP_INTENT,
            ProcessSetupIntentPayload {
                reader: reader.to_string(),
                process_setup_intent_params: params.clone(),
            },
        )
        .await
    }

    async fn process_payment_intent(
        &self,
        reader: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value> {
        self.call(
            endpoint::PROCESS_PAYMENT_INTENT,
            ProcessPaymentIntentPayload {
                reader: reader.to_string(),
                process_payment_intent_params: params.clone(),
            },
        )
        .await
    }

    async fn simulate_present_payment_method(&self, reader: &str) -> Result<Value> {
        self.call(
            endpoint::SIMULATE_PRESENT_PAYMENT_METHOD,
            ReaderPayload {
                reader: reader.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_header_is_optional() {
        let session = SessionContext::default();
        assert!(SignatureHeader(None).headers(&session).is_empty());
        assert_eq!(
            SignatureHeader(Some("t=1,v1=abc".to_string())).headers(&session),
            vec![("stripe-signature".to_string(), "t=1,v1=abc".to_string())]
        );
    }

    #[test]
    fn closures_act_as_signers() {
        let signer = |session: &SessionContext| {
            vec![("x-user".to_string(), session.user_id.clone())]
        };
        let session = SessionContext {
            user_id: "usr_9".to_string(),
            account_id: "acct_9".to_string(),
        };
        assert_eq!(
            signer.headers(&session),
            vec![("x-user".to_string(), "usr_9".to_string())]
        );
    }
}
