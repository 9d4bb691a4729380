//! Processor client against a mock processor API.

mod common;

use std::time::Duration;

use common::mock_server::{MockResponse, MockServer};
use terminal_checkout::config::SecureString;
use terminal_checkout::error::CheckoutError;
use terminal_checkout::intent::{
    CaptureMethod, CreateIntent, IntentGateway, IntentId, IntentKind, IntentStatus,
    PaymentIntentParams, SetupIntentParams,
};
use terminal_checkout::processor::ProcessorClient;
use terminal_checkout::terminal::ReaderListParams;

fn client(server: &MockServer) -> ProcessorClient {
    ProcessorClient::new(
        server.base_url(),
        SecureString::new("sk_test_123".to_string()),
        Duration::from_secs(2),
        Duration::from_secs(5),
    )
}

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[tokio::test]
async fn create_payment_intent_posts_form() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(
            r#"{"id":"pi_123","object":"payment_intent","status":"requires_payment_method"}"#,
        ))
        .await;

    let id = client(&server)
        .create(&CreateIntent::Payment(PaymentIntentParams {
            amount: 1250,
            currency: "usd".to_string(),
            customer: Some("cus_1".to_string()),
            capture_method: CaptureMethod::Automatic,
        }))
        .await
        .unwrap();
    assert_eq!(id, IntentId::new("pi_123"));

    let request = server.last_request().await;
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v1/payment_intents");
    assert!(request.header("authorization").is_some_and(|v| v.starts_with("Basic ")));
    assert!(request.header("idempotency-key").is_some());

    let form = request.form();
    assert!(form.contains(&pair("payment_method_types[]", "card_present")));
    assert!(form.contains(&pair("amount", "1250")));
    assert!(form.contains(&pair("currency", "usd")));
    assert!(form.contains(&pair("capture_method", "automatic")));
    assert!(form.contains(&pair("customer", "cus_1")));
}

#[tokio::test]
async fn create_setup_intent_is_off_session() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(
            r#"{"id":"seti_456","object":"setup_intent","status":"requires_payment_method"}"#,
        ))
        .await;

    let id = client(&server)
        .create(&CreateIntent::Setup(SetupIntentParams {
            customer: None,
            usage: "off_session".to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(id.kind(), Some(IntentKind::Setup));

    let request = server.last_request().await;
    assert_eq!(request.path, "/v1/setup_intents");
    let form = request.form();
    assert!(form.contains(&pair("usage", "off_session")));
    assert!(!form.iter().any(|(k, _)| k == "customer"));
}

#[tokio::test]
async fn each_create_gets_its_own_idempotency_key() {
    let server = MockServer::start().await;
    let body = r#"{"id":"pi_1","object":"payment_intent","status":"requires_payment_method"}"#;
    server.enqueue(MockResponse::json(body)).await;
    server.enqueue(MockResponse::json(body)).await;

    let client = client(&server);
    let request = CreateIntent::Payment(PaymentIntentParams {
        amount: 100,
        currency: "usd".to_string(),
        customer: None,
        capture_method: CaptureMethod::Automatic,
    });
    client.create(&request).await.unwrap();
    client.create(&request).await.unwrap();

    let requests = server.captured_requests().await;
    let first = requests[0].header("idempotency-key").unwrap().to_string();
    let second = requests[1].header("idempotency-key").unwrap().to_string();
    assert_ne!(first, second);
}

#[tokio::test]
async fn rejected_create_is_creation_error() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::error(400, "Amount must be at least $0.50 usd"))
        .await;

    let err = client(&server)
        .create(&CreateIntent::Payment(PaymentIntentParams {
            amount: 1,
            currency: "usd".to_string(),
            customer: None,
            capture_method: CaptureMethod::Automatic,
        }))
        .await
        .unwrap_err();

    match err {
        CheckoutError::Creation { kind, message } => {
            assert_eq!(kind, IntentKind::Payment);
            assert!(message.contains("Amount must be at least"));
        }
        other => panic!("expected Creation error, got {:?}", other),
    }
}

#[tokio::test]
async fn retrieve_dispatches_on_prefix() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(
            r#"{"id":"seti_456","object":"setup_intent","status":"succeeded","last_setup_error":null}"#,
        ))
        .await;

    let intent = client(&server)
        .retrieve(&IntentId::new("seti_456"))
        .await
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Succeeded);

    let request = server.last_request().await;
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/v1/setup_intents/seti_456");
}

#[tokio::test]
async fn retrieve_unknown_prefix_makes_no_request() {
    let server = MockServer::start().await;
    let err = client(&server)
        .retrieve(&IntentId::new("ch_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::UnknownIntent { .. }));
    assert!(server.captured_requests().await.is_empty());
}

#[tokio::test]
async fn capture_posts_to_capture_path() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(
            r#"{"id":"pi_789","object":"payment_intent","status":"succeeded"}"#,
        ))
        .await;

    let intent = client(&server)
        .capture(&IntentId::new("pi_789"))
        .await
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Succeeded);
    assert_eq!(
        server.last_request().await.path,
        "/v1/payment_intents/pi_789/capture"
    );
}

#[tokio::test]
async fn capture_refuses_setup_intents() {
    let server = MockServer::start().await;
    let err = client(&server)
        .capture(&IntentId::new("seti_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::UnknownIntent { .. }));
    assert!(server.captured_requests().await.is_empty());
}

#[tokio::test]
async fn cancel_swallows_failures() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::error(400, "This PaymentIntent has already been canceled"))
        .await;

    client(&server).cancel(&IntentId::new("pi_1")).await;
    assert_eq!(
        server.last_request().await.path,
        "/v1/payment_intents/pi_1/cancel"
    );
}

#[tokio::test]
async fn list_readers_queries_and_unwraps_data() {
    let server = MockServer::start().await;
    server
        .enqueue(MockResponse::json(
            r#"{"object":"list","data":[{"id":"tmr_1","device_type":"bbpos_wisepos_e","status":"online"}],"has_more":false}"#,
        ))
        .await;

    let readers = client(&server)
        .list_readers(&ReaderListParams::online(5))
        .await
        .unwrap();
    assert_eq!(readers.len(), 1);
    assert_eq!(readers[0].id, "tmr_1");

    let request = server.last_request().await;
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/v1/terminal/readers");
    let query = request.query_pairs();
    assert!(query.contains(&pair("limit", "5")));
    assert!(query.contains(&pair("status", "online")));
}

#[tokio::test]
async fn present_payment_method_uses_test_helper_path() {
    let server = MockServer::start().await;
    client(&server).present_payment_method("tmr_1").await.unwrap();
    assert_eq!(
        server.last_request().await.path,
        "/v1/test_helpers/terminal/readers/tmr_1/present_payment_method"
    );
}
