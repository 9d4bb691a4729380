//! Relay service: the HTTP hop between a checkout session and the
//! processor's terminal API.
//!
//! Accepts `{user_id, account_id, payload}` on one route per device action
//! and forwards the payload. No caller verification is done here; the
//! identity is only logged.

mod error;
mod handlers;
mod shutdown;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::terminal::{endpoint, DeviceActions};

pub use error::RelayError;
pub use handlers::HealthStatus;
pub use shutdown::ShutdownSignal;

pub fn build_router(devices: Arc<dyn DeviceActions>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(&route(endpoint::SET_DISPLAY), post(handlers::set_display))
        .route(&route(endpoint::LIST_READERS), post(handlers::list_readers))
        .route(&route(endpoint::CANCEL_ACTION), post(handlers::cancel_action))
        .route(
            &route(endpoint::PROCESS_SETUP_INTENT),
            post(handlers::process_setup_intent),
        )
        .route(
            &route(endpoint::PROCESS_PAYMENT_INTENT),
            post(handlers::process_payment_intent),
        )
        .route(
            &route(endpoint::SIMULATE_PRESENT_PAYMENT_METHOD),
            post(handlers::simulate_present_payment_method),
        )
        .with_state(devices)
}

fn route(endpoint: &str) -> String {
    format!("/{}", endpoint)
}

pub struct RelayServer {
    pub addr: SocketAddr,
    /// Populated by `bind()`, consumed by `run()`.
    listener: Option<TcpListener>,
    devices: Arc<dyn DeviceActions>,
    shutdown: Arc<ShutdownSignal>,
}

impl RelayServer {
    pub fn new(devices: Arc<dyn DeviceActions>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            listener: None,
            devices,
            shutdown: Arc::new(ShutdownSignal::new()),
        }
    }

    /// Bind the listener now so the port is ours before `run()`.
    pub async fn bind(&mut self, bind_addr: &str) -> Result<SocketAddr, RelayError> {
        let addr: SocketAddr = bind_addr.parse().map_err(|e: std::net::AddrParseError| {
            RelayError::InvalidAddress {
                addr: bind_addr.to_string(),
                reason: e.to_string(),
            }
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;
        self.addr = listener.local_addr()?;
        self.listener = Some(listener);
        tracing::info!(addr = %self.addr, "Relay bound");
        Ok(self.addr)
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Serve until Ctrl-C, SIGTERM, or [`RelayHandle::shutdown`].
    pub async fn run(self) -> Result<(), RelayError> {
        let listener = self.listener.ok_or(RelayError::NotBound)?;

        tracing::info!(addr = %self.addr, "Starting relay");

        let app = build_router(self.devices);
        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(err) = shutdown.wait().await {
                    tracing::error!(error = %err, "Failed to install signal handler");
                }
            })
            .into_future()
            .await?;

        tracing::info!("Relay stopped");
        Ok(())
    }
}

#[derive(Clone)]
pub struct RelayHandle {
    shutdown: Arc<ShutdownSignal>,
}

impl RelayHandle {
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }
}
