use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::terminal::{
    DeviceActions, ListReadersPayload, ProcessPaymentIntentPayload, ProcessSetupIntentPayload,
    Reader, ReaderPayload, RelayRequest, SetDisplayPayload,
};

use super::error::RelayError;

pub(super) type Devices = Arc<dyn DeviceActions>;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

pub(super) async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        service: "terminal-checkout-relay".to_string(),
    })
}

fn log_caller<P>(endpoint: &str, request: &RelayRequest<P>) {
    tracing::info!(
        endpoint,
        user_id = %request.user_id,
        account_id = %request.account_id,
        "Relay request"
    );
}

pub(super) async fn set_display(
    State(devices): State<Devices>,
    Json(request): Json<RelayRequest<SetDisplayPayload>>,
) -> Result<Json<Value>, RelayError> {
    log_caller("set_display", &request);
    let payload = request.payload;
    let response = devices
        .set_display(&payload.reader, &payload.reader_display_params)
        .await?;
    Ok(Json(response))
}

pub(super) async fn list_readers(
    State(devices): State<Devices>,
    Json(request): Json<RelayRequest<ListReadersPayload>>,
) -> Result<Json<Vec<Reader>>, RelayError> {
    log_caller("list_readers", &request);
    let readers = devices
        .list_readers(&request.payload.reader_list_params)
        .await?;
    Ok(Json(readers))
}

pub(super) async fn cancel_action(
    State(devices): State<Devices>,
    Json(request): Json<RelayRequest<ReaderPayload>>,
) -> Result<Json<Value>, RelayError> {
    log_caller("cancel_action", &request);
    Ok(Json(devices.cancel_action(&request.payload.reader).await?))
}

pub(super) async fn process_setup_intent(
    State(devices): State<Devices>,
    Json(request): Json<RelayRequest<ProcessSetupIntentPayload>>,
) -> Result<Json<Value>, RelayError> {
    log_caller("process_setup_intent", &request);
    let payload = request.payload;
    let response = devices
        .process_setup_intent(&payload.reader, &payload.process_setup_intent_params)
        .await?;
    Ok(Json(response))
}

pub(super) async fn process_payment_intent(
    State(devices): State<Devices>,
    Json(request): Json<RelayRequest<ProcessPaymentIntentPayload>>,
) -> Result<Json<Value>, RelayError> {
    log_caller("process_payment_intent", &request);
    let payload = request.payload;
    let response = devices
        .process_payment_intent(&payload.reader, &payload.process_payment_intent_params)
        .await?;
    Ok(Json(response))
}

pub(super) async fn simulate_present_payment_method(
    State(devices): State<Devices>,
    Json(request): Json<RelayRequest<ReaderPayload>>,
) -> Result<Json<Value>, RelayError> {
    log_caller("simulate_present_payment_method", &request);
    let response = devices
        .simulate_present_payment_method(&request.payload.reader)
        .await?;
    Ok(Json(response))
}
