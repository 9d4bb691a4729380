//! Shared test utilities: in-memory fakes of the two remote seams and an
//! HTTP mock server.

#![allow(dead_code, unused_imports)]

pub mod mock_server;

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

use terminal_checkout::error::{CheckoutError, Result};
use terminal_checkout::intent::{
    CreateIntent, Intent, IntentError, IntentGateway, IntentId, IntentKind, IntentStatus,
};
use terminal_checkout::terminal::{
    DeviceActions, ProcessPaymentIntentParams, ProcessSetupIntentParams, Reader,
    ReaderDisplayParams, ReaderListParams,
};

pub fn reader(id: &str, device_type: &str) -> Reader {
    Reader {
        id: id.to_string(),
        label: Some(format!("Reader {}", id)),
        device_type: device_type.to_string(),
        status: None,
        serial_number: None,
    }
}

pub fn simulated_reader(id: &str) -> Reader {
    reader(id, "simulated_wisepos_e")
}

fn api_error(message: &str) -> CheckoutError {
    CheckoutError::Api {
        status: 500,
        message: message.to_string(),
    }
}

/// Create a temporary config file with the given TOML content.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// -- Device actions -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetDisplay(String),
    ListReaders(ReaderListParams),
    CancelAction(String),
    ProcessSetupIntent { reader: String, setup_intent: String },
    ProcessPaymentIntent { reader: String, payment_intent: String },
    SimulatePresent(String),
}

/// Records every call; answers from whatever the test configured.
#[derive(Default)]
pub struct FakeDevices {
    calls: Mutex<Vec<DeviceCall>>,
    readers: Mutex<Vec<Reader>>,
    fail_list: Mutex<bool>,
    fail_push: Mutex<bool>,
    fail_simulate: Mutex<bool>,
}

impl FakeDevices {
    pub fn with_readers(readers: Vec<Reader>) -> Arc<Self> {
        let fake = Self::default();
        *fake.readers.lock() = readers;
        Arc::new(fake)
    }

    pub fn set_readers(&self, readers: Vec<Reader>) {
        *self.readers.lock() = readers;
    }

    pub fn fail_list(&self, fail: bool) {
        *self.fail_list.lock() = fail;
    }

    pub fn fail_push(&self, fail: bool) {
        *self.fail_push.lock() = fail;
    }

    pub fn fail_simulate(&self, fail: bool) {
        *self.fail_simulate.lock() = fail;
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl DeviceActions for FakeDevices {
    async fn set_display(&self, reader: &str, _params: &ReaderDisplayParams) -> Result<Value> {
        self.record(DeviceCall::SetDisplay(reader.to_string()));
        Ok(json!({"id": reader, "object": "terminal.reader"}))
    }

    async fn list_readers(&self, filter: &ReaderListParams) -> Result<Vec<Reader>> {
        self.record(DeviceCall::ListReaders(filter.clone()));
        if *self.fail_list.lock() {
            return Err(api_error("reader list unavailable"));
        }
        Ok(self.readers.lock().clone())
    }

    async fn cancel_action(&self, reader: &str) -> Result<Value> {
        self.record(DeviceCall::CancelAction(reader.to_string()));
        Ok(json!({"id": reader, "action": null}))
    }

    async fn process_setup_intent(
        &self,
        reader: &str,
        params: &ProcessSetupIntentParams,
    ) -> Result<Value> {
        self.record(DeviceCall::ProcessSetupIntent {
            reader: reader.to_string(),
            setup_intent: params.setup_intent.clone(),
        });
        if *self.fail_push.lock() {
            return Err(api_error("Reader is busy"));
        }
        Ok(json!({"id": reader}))
    }

    async fn process_payment_intent(
        &self,
        reader: &str,
        params: &ProcessPaymentIntentParams,
    ) -> Result<Value> {
        self.record(DeviceCall::ProcessPaymentIntent {
            reader: reader.to_string(),
            payment_intent: params.payment_intent.clone(),
        });
        if *self.fail_push.lock() {
            return Err(api_error("Reader is busy"));
        }
        Ok(json!({"id": reader}))
    }

    async fn simulate_present_payment_method(&self, reader: &str) -> Result<Value> {
        self.record(DeviceCall::SimulatePresent(reader.to_string()));
        if *self.fail_simulate.lock() {
            return Err(api_error("Reader is not simulated"));
        }
        Ok(json!({"id": reader}))
    }
}

// -- Intent gateway -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Create(IntentKind),
    Retrieve(IntentId),
    Capture(IntentId),
    Cancel(IntentId),
}

/// One scripted answer to `retrieve`.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Status(IntentStatus),
    /// Still waiting, with a last-error message attached.
    Declined(String),
    /// The retrieve call itself fails.
    Fail,
}

/// Intent gateway whose `retrieve` answers come from a per-intent script.
/// The last script entry repeats forever; an unscripted intent stays
/// `requires_payment_method`.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<GatewayCall>>,
    next_ids: Mutex<VecDeque<String>>,
    scripts: Mutex<HashMap<String, VecDeque<Poll>>>,
    create_error: Mutex<Option<String>>,
    capture_error: Mutex<Option<String>>,
    create_delay: Mutex<Duration>,
    retrieve_delay: Mutex<Duration>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Ids handed out by successive `create` calls.
    pub fn with_ids(ids: &[&str]) -> Arc<Self> {
        let fake = Self::default();
        *fake.next_ids.lock() = ids.iter().map(|s| s.to_string()).collect();
        Arc::new(fake)
    }

    pub fn script(&self, id: &str, polls: Vec<Poll>) {
        self.scripts
            .lock()
            .insert(id.to_string(), polls.into_iter().collect());
    }

    pub fn fail_create(&self, message: &str) {
        *self.create_error.lock() = Some(message.to_string());
    }

    pub fn fail_capture(&self, message: &str) {
        *self.capture_error.lock() = Some(message.to_string());
    }

    /// `create` answers only after `delay`.
    pub fn slow_create(&self, delay: Duration) {
        *self.create_delay.lock() = delay;
    }

    /// `retrieve` is recorded at once but answers only after `delay`.
    pub fn slow_retrieve(&self, delay: Duration) {
        *self.retrieve_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn retrieves(&self, id: &str) -> usize {
        self.count(|c| matches!(c, GatewayCall::Retrieve(i) if i.as_str() == id))
    }

    pub fn cancels(&self, id: &str) -> usize {
        self.count(|c| matches!(c, GatewayCall::Cancel(i) if i.as_str() == id))
    }

    pub fn captures(&self, id: &str) -> usize {
        self.count(|c| matches!(c, GatewayCall::Capture(i) if i.as_str() == id))
    }

    fn next_poll(&self, id: &IntentId) -> Poll {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(id.as_str()) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or(Poll::Fail),
            Some(script) => script
                .front()
                .cloned()
                .unwrap_or(Poll::Status(IntentStatus::RequiresPaymentMethod)),
            None => Poll::Status(IntentStatus::RequiresPaymentMethod),
        }
    }
}

pub fn intent(id: &IntentId, status: IntentStatus, message: Option<&str>) -> Intent {
    let kind = id.kind().unwrap_or(IntentKind::Payment);
    let error = message.map(|m| IntentError {
        code: Some("card_declined".to_string()),
        message: Some(m.to_string()),
    });
    let (last_payment_error, last_setup_error) = match kind {
        IntentKind::Payment => (error, None),
        IntentKind::Setup => (None, error),
    };
    Intent {
        id: id.clone(),
        object: kind.object_name().to_string(),
        status,
        last_payment_error,
        last_setup_error,
    }
}

#[async_trait]
impl IntentGateway for FakeGateway {
    async fn create(&self, request: &CreateIntent) -> Result<IntentId> {
        let kind = request.kind();
        self.calls.lock().push(GatewayCall::Create(kind));
        let delay = *self.create_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.create_error.lock().clone() {
            return Err(CheckoutError::Creation { kind, message });
        }
        let id = self.next_ids.lock().pop_front().unwrap_or_else(|| match kind {
            IntentKind::Payment => "pi_default".to_string(),
            IntentKind::Setup => "seti_default".to_string(),
        });
        Ok(IntentId::new(id))
    }

    async fn retrieve(&self, id: &IntentId) -> Result<Intent> {
        self.calls.lock().push(GatewayCall::Retrieve(id.clone()));
        let delay = *self.retrieve_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.next_poll(id) {
            Poll::Status(status) => Ok(intent(id, status, None)),
            Poll::Declined(message) => Ok(intent(
                id,
                IntentStatus::RequiresPaymentMethod,
                Some(&message),
            )),
            Poll::Fail => Err(api_error("processor unavailable")),
        }
    }

    async fn capture(&self, id: &IntentId) -> Result<Intent> {
        self.calls.lock().push(GatewayCall::Capture(id.clone()));
        if let Some(message) = self.capture_error.lock().clone() {
            return Err(api_error(&message));
        }
        // The processor reports success from here on.
        self.script(id.as_str(), vec![Poll::Status(IntentStatus::Succeeded)]);
        Ok(intent(id, IntentStatus::Succeeded, None))
    }

    async fn cancel(&self, id: &IntentId) {
        self.calls.lock().push(GatewayCall::Cancel(id.clone()));
    }
}
