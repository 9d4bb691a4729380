//! Session runtime: owns the workflow state and runs reducer effects.
//!
//! One task per session. It receives user actions from a [`SessionHandle`],
//! monitor events from its [`PollingMonitor`], and results of effects it
//! spawned earlier, feeds each through [`WorkflowReducer`], then publishes
//! the new state on a watch channel.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::CheckoutError;
use crate::intent::{IntentGateway, IntentId, IntentKind};
use crate::monitor::{MonitorConfig, MonitorEvents, PollingMonitor};
use crate::mvi::Reducer;
use crate::terminal::{DeviceActions, ProcessPaymentIntentParams, ProcessSetupIntentParams};

use super::intent::{Effect, UserAction, WorkflowIntent};
use super::reducer::WorkflowReducer;
use super::state::{Phase, WorkflowSettings, WorkflowState, DEFAULT_AMOUNT};

const ACTION_BUFFER: usize = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("checkout session has stopped")]
pub struct SessionClosed;

/// Everything a session needs besides its two clients.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub settings: WorkflowSettings,
    pub amount: u64,
    pub monitor: MonitorConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settings: WorkflowSettings::default(),
            amount: DEFAULT_AMOUNT,
            monitor: MonitorConfig::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: WorkflowSettings {
                reader_limit: config.checkout.reader_limit,
                currency: config.checkout.currency.clone(),
                customer: config.session.customer.clone(),
                capture_method: config.checkout.capture_method,
            },
            amount: config.checkout.default_amount,
            monitor: MonitorConfig {
                poll_interval: config.checkout.poll_interval(),
                deadline: config.checkout.timeout(),
            },
        }
    }
}

pub struct Session;

impl Session {
    /// Start a session on the current tokio runtime. It begins in
    /// `Loading` and immediately asks for the reader list.
    pub fn spawn(
        devices: Arc<dyn DeviceActions>,
        gateway: Arc<dyn IntentGateway>,
        options: SessionOptions,
    ) -> SessionHandle {
        let (action_tx, action_rx) = mpsc::channel(ACTION_BUFFER);
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (monitor, monitor_rx) = PollingMonitor::channel(gateway.clone(), options.monitor);

        let state = WorkflowState::new(options.settings, options.amount);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.clone());

        let runtime = WorkflowRuntime {
            state,
            devices,
            gateway,
            monitor,
            results: result_tx,
            snapshots: snapshot_tx,
        };
        let task = tokio::spawn(runtime.run(action_rx, monitor_rx, result_rx));

        SessionHandle {
            actions: action_tx,
            snapshots: snapshot_rx,
            task,
        }
    }
}

/// Client side of a running session.
pub struct SessionHandle {
    actions: mpsc::Sender<UserAction>,
    snapshots: watch::Receiver<WorkflowState>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, action: UserAction) -> Result<(), SessionClosed> {
        self.actions.send(action).await.map_err(|_| SessionClosed)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> WorkflowState {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.snapshots.clone()
    }

    /// Wait until a published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<WorkflowState, SessionClosed>
    where
        F: FnMut(&WorkflowState) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| SessionClosed)?;
        Ok(state.clone())
    }

    /// Stop the session. Anything still outstanding on the reader or the
    /// processor is cancelled before this returns.
    pub async fn shutdown(self) {
        drop(self.actions);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "Checkout session task failed");
        }
    }
}

struct WorkflowRuntime {
    state: WorkflowState,
    devices: Arc<dyn DeviceActions>,
    gateway: Arc<dyn IntentGateway>,
    monitor: PollingMonitor,
    results: mpsc::UnboundedSender<WorkflowIntent>,
    snapshots: watch::Sender<WorkflowState>,
}

impl WorkflowRuntime {
    async fn run(
        mut self,
        mut actions: mpsc::Receiver<UserAction>,
        mut monitor_events: MonitorEvents,
        mut results: mpsc::UnboundedReceiver<WorkflowIntent>,
    ) {
        tracing::info!("Checkout session started");
        self.dispatch(WorkflowIntent::Load);

        loop {
            let intent = tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => {
                        tracing::debug!(?action, "User action");
                        WorkflowIntent::from(action)
                    }
                    None => break,
                },
                Some(event) = monitor_events.recv() => WorkflowIntent::Monitor(event),
                Some(result) = results.recv() => result,
            };
            self.dispatch(intent);
        }

        self.release().await;
        tracing::info!("Checkout session stopped");
    }

    /// Reduce `intent` and everything it synchronously leads to.
    fn dispatch(&mut self, intent: WorkflowIntent) {
        let mut queue = VecDeque::from([intent]);

        while let Some(intent) = queue.pop_front() {
            let previous = self.state.phase;
            let state = std::mem::take(&mut self.state);
            let (state, effects) = WorkflowReducer::reduce(state, intent);
            self.state = state;
            debug_assert!(
                self.state.invariants_hold(),
                "workflow invariant broken in {}",
                self.state.phase
            );

            if previous != self.state.phase {
                tracing::info!(from = %previous, to = %self.state.phase, "Workflow transition");
                if self.state.phase == Phase::Error {
                    tracing::warn!(error = %self.state.error, "Workflow error");
                }
                if self.state.phase == Phase::Loading {
                    queue.push_back(WorkflowIntent::Load);
                }
            }

            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect) {
                    queue.push_back(follow_up);
                }
            }
        }

        self.snapshots.send_replace(self.state.clone());
    }

    /// Start an effect. Returns an intent to reduce right away when the
    /// effect completes synchronously.
    fn run_effect(&mut self, effect: Effect) -> Option<WorkflowIntent> {
        match effect {
            Effect::ListReaders(params) => {
                let devices = self.devices.clone();
                self.spawn_result(async move {
                    let result = devices.list_readers(&params).await.map_err(|err| {
                        log_failure("list_readers", &err);
                        err.to_string()
                    });
                    WorkflowIntent::ReadersLoaded(result)
                });
                None
            }
            Effect::CreateIntent(request) => {
                let gateway = self.gateway.clone();
                let results = self.results.clone();
                tokio::spawn(async move {
                    let kind = request.kind();
                    let result = gateway.create(&request).await.map_err(|err| {
                        log_failure("create_intent", &err);
                        failure_text(err)
                    });
                    let created = result.as_ref().ok().cloned();
                    let delivered = results
                        .send(WorkflowIntent::IntentCreated { kind, result })
                        .is_ok();
                    // The session stopped while the processor was creating it.
                    if let (false, Some(intent_id)) = (delivered, created) {
                        tracing::warn!(intent_id = %intent_id, "Canceling intent created after session stopped");
                        gateway.cancel(&intent_id).await;
                    }
                });
                None
            }
            Effect::PushToReader {
                reader,
                intent_id,
                kind,
            } => {
                let devices = self.devices.clone();
                self.spawn_result(async move {
                    let result = push_to_reader(devices.as_ref(), &reader, &intent_id, kind)
                        .await
                        .map_err(|err| {
                            log_failure("push_to_reader", &err);
                            err.to_string()
                        });
                    WorkflowIntent::IntentPushed { intent_id, result }
                });
                None
            }
            Effect::ArmMonitor {
                intent_id,
                generation,
            } => {
                self.monitor.arm(intent_id, generation);
                None
            }
            Effect::DisarmMonitor => {
                self.monitor.disarm();
                None
            }
            Effect::Capture { intent_id } => {
                let gateway = self.gateway.clone();
                self.spawn_result(async move {
                    let result = gateway.capture(&intent_id).await.map(|_| ()).map_err(|err| {
                        log_failure("capture_intent", &err);
                        err.to_string()
                    });
                    WorkflowIntent::CaptureFinished { intent_id, result }
                });
                None
            }
            Effect::CancelReaderAction { reader } => {
                let devices = self.devices.clone();
                tokio::spawn(async move { cancel_reader_action(devices.as_ref(), &reader).await });
                None
            }
            Effect::CancelIntent { intent_id } => {
                let gateway = self.gateway.clone();
                tokio::spawn(async move { gateway.cancel(&intent_id).await });
                None
            }
            Effect::SimulatePresent { reader } => {
                let devices = self.devices.clone();
                self.spawn_result(async move {
                    let result = devices
                        .simulate_present_payment_method(&reader)
                        .await
                        .map(|_| ())
                        .map_err(|err| {
                            log_failure("simulate_present_payment_method", &err);
                            err.to_string()
                        });
                    WorkflowIntent::SimulateFinished(result)
                });
                None
            }
            Effect::CompleteReset => Some(WorkflowIntent::ResetComplete),
        }
    }

    fn spawn_result<F>(&self, future: F)
    where
        F: Future<Output = WorkflowIntent> + Send + 'static,
    {
        let results = self.results.clone();
        tokio::spawn(async move {
            if results.send(future.await).is_err() {
                tracing::trace!("Effect result dropped (session gone)");
            }
        });
    }

    /// Run the cancel half of a reset and wait for it, so nothing is left
    /// collecting on the reader after the session is gone.
    async fn release(&mut self) {
        if self.state.active_intent.is_none() && self.state.pending.is_none() {
            self.monitor.disarm();
            return;
        }

        let state = std::mem::take(&mut self.state);
        let (state, effects) = WorkflowReducer::reduce(state, WorkflowIntent::Cancel);
        self.state = state;

        for effect in effects {
            match effect {
                Effect::DisarmMonitor => self.monitor.disarm(),
                Effect::CancelReaderAction { reader } => {
                    cancel_reader_action(self.devices.as_ref(), &reader).await
                }
                Effect::CancelIntent { intent_id } => self.gateway.cancel(&intent_id).await,
                _ => {}
            }
        }
        self.snapshots.send_replace(self.state.clone());
    }
}

async fn push_to_reader(
    devices: &dyn DeviceActions,
    reader: &str,
    intent_id: &IntentId,
    kind: IntentKind,
) -> crate::error::Result<()> {
    match kind {
        IntentKind::Payment => {
            let params = ProcessPaymentIntentParams {
                payment_intent: intent_id.to_string(),
            };
            devices.process_payment_intent(reader, &params).await?;
        }
        IntentKind::Setup => {
            let params = ProcessSetupIntentParams {
                setup_intent: intent_id.to_string(),
                customer_consent_collected: true,
            };
            devices.process_setup_intent(reader, &params).await?;
        }
    }
    tracing::info!(reader, intent_id = %intent_id, %kind, "Intent sent to reader");
    Ok(())
}

async fn cancel_reader_action(devices: &dyn DeviceActions, reader: &str) {
    if let Err(err) = devices.cancel_action(reader).await {
        tracing::warn!(
            reader,
            error_type = err.error_type(),
            error = %err,
            "Best-effort reader cancel failed"
        );
    }
}

fn log_failure(operation: &str, err: &CheckoutError) {
    tracing::warn!(
        operation,
        error_type = err.error_type(),
        status = err.status(),
        error = %err,
        "Checkout call failed"
    );
}

/// Text shown to the user. Creation failures carry the processor's own
/// message, which the workflow wraps itself.
fn failure_text(err: CheckoutError) -> String {
    match err {
        CheckoutError::Creation { message, .. } => message,
        other => other.to_string(),
    }
}
