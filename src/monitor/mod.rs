//! Polling Monitor: watches one intent until it reaches a terminal status
//! or the deadline passes.
//!
//! An armed monitor owns two tasks, a repeating status check and a one-shot
//! deadline. They share a claim flag so exactly one of them emits the
//! terminating event, and they are always aborted together.
//!
//! Each tick starts its status check in the background, so a slow
//! processor never holds back the next tick.
//!
//! Every event carries the generation it was armed with. [`MonitorEvents`]
//! only yields events of the live generation, so an event that was already
//! queued when `disarm` ran is never seen after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::intent::{last_error, Intent, IntentGateway, IntentId, IntentStatus};

/// Timing for an armed monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(90),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Never armed.
    Idle,
    /// Tasks running, nothing claimed yet.
    Armed,
    /// A terminating event was claimed and sent; waiting for `disarm`.
    Firing,
    /// Torn down.
    Disarmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEventKind {
    Completed,
    Canceled,
    CaptureRequired,
    TimedOut,
    /// Non-terminal: the intent's last error text changed.
    LastError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub generation: u64,
    pub intent_id: IntentId,
    pub kind: MonitorEventKind,
}

type MonitorSender = mpsc::UnboundedSender<MonitorEvent>;

/// Generation of the live schedule, shared by the monitor and its receiver.
type LiveGeneration = Arc<Mutex<Option<u64>>>;

/// Receiving half of a [`PollingMonitor`].
pub struct MonitorEvents {
    rx: mpsc::UnboundedReceiver<MonitorEvent>,
    live: LiveGeneration,
}

impl MonitorEvents {
    /// Next event of the live generation. `None` once the monitor is gone.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        loop {
            let event = self.rx.recv().await?;
            if self.is_live(&event) {
                return Some(event);
            }
        }
    }

    pub fn try_recv(&mut self) -> std::result::Result<MonitorEvent, TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if self.is_live(&event) {
                return Ok(event);
            }
        }
    }

    fn is_live(&self, event: &MonitorEvent) -> bool {
        let live = *self.live.lock() == Some(event.generation);
        if !live {
            tracing::trace!(
                intent_id = %event.intent_id,
                generation = event.generation,
                "Dropping event from a disarmed schedule"
            );
        }
        live
    }
}

struct Schedule {
    generation: u64,
    intent_id: IntentId,
    claimed: Arc<AtomicBool>,
    interval: JoinHandle<()>,
    deadline: JoinHandle<()>,
}

pub struct PollingMonitor {
    gateway: Arc<dyn IntentGateway>,
    config: MonitorConfig,
    events: MonitorSender,
    live: LiveGeneration,
    schedule: Option<Schedule>,
    armed_once: bool,
}

impl PollingMonitor {
    /// A disarmed monitor and the receiver for its events.
    pub fn channel(
        gateway: Arc<dyn IntentGateway>,
        config: MonitorConfig,
    ) -> (Self, MonitorEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let live = LiveGeneration::default();
        let monitor = Self {
            gateway,
            config,
            events: tx,
            live: live.clone(),
            schedule: None,
            armed_once: false,
        };
        (monitor, MonitorEvents { rx, live })
    }

    pub fn phase(&self) -> MonitorPhase {
        match &self.schedule {
            Some(schedule) if schedule.claimed.load(Ordering::SeqCst) => MonitorPhase::Firing,
            Some(_) => MonitorPhase::Armed,
            None if self.armed_once => MonitorPhase::Disarmed,
            None => MonitorPhase::Idle,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.schedule.is_some()
    }

    /// Generation and intent of the live schedule, if any.
    pub fn current(&self) -> Option<(u64, &IntentId)> {
        self.schedule
            .as_ref()
            .map(|s| (s.generation, &s.intent_id))
    }

    /// Start watching `intent_id`. Any live schedule is torn down first,
    /// so there is never more than one.
    pub fn arm(&mut self, intent_id: IntentId, generation: u64) {
        self.disarm();
        *self.live.lock() = Some(generation);

        let claimed = Arc::new(AtomicBool::new(false));
        let interval = tokio::spawn(poll_loop(
            self.gateway.clone(),
            self.events.clone(),
            intent_id.clone(),
            generation,
            self.config.poll_interval,
            claimed.clone(),
        ));
        let deadline = tokio::spawn(deadline_timer(
            self.events.clone(),
            intent_id.clone(),
            generation,
            self.config.deadline,
            claimed.clone(),
        ));

        tracing::info!(
            intent_id = %intent_id,
            generation,
            interval_secs = self.config.poll_interval.as_secs_f64(),
            deadline_secs = self.config.deadline.as_secs_f64(),
            "Monitor armed"
        );

        self.schedule = Some(Schedule {
            generation,
            intent_id,
            claimed,
            interval,
            deadline,
        });
        self.armed_once = true;
    }

    /// Tear down both tasks. No-op when nothing is armed.
    pub fn disarm(&mut self) {
        let Some(schedule) = self.schedule.take() else {
            return;
        };
        // Claim first so a task between its await points cannot emit.
        schedule.claimed.store(true, Ordering::SeqCst);
        *self.live.lock() = None;
        schedule.interval.abort();
        schedule.deadline.abort();
        tracing::debug!(
            intent_id = %schedule.intent_id,
            generation = schedule.generation,
            "Monitor disarmed"
        );
    }
}

impl Drop for PollingMonitor {
    fn drop(&mut self) {
        self.disarm();
    }
}

fn claim(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

async fn poll_loop(
    gateway: Arc<dyn IntentGateway>,
    events: MonitorSender,
    intent_id: IntentId,
    generation: u64,
    period: Duration,
    claimed: Arc<AtomicBool>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Dropped with this task, which aborts any check still running.
    let mut checks: JoinSet<Result<Intent>> = JoinSet::new();
    let mut last_message = String::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if claimed.load(Ordering::SeqCst) {
                    return;
                }
                let gateway = gateway.clone();
                let id = intent_id.clone();
                checks.spawn(async move { gateway.retrieve(&id).await });
            }
            Some(joined) = checks.join_next() => {
                let intent = match joined {
                    Ok(Ok(intent)) => intent,
                    Ok(Err(err)) => {
                        // Transient: a later tick or the deadline decides.
                        tracing::warn!(
                            intent_id = %intent_id,
                            error_type = err.error_type(),
                            error = %err,
                            "Intent status check failed"
                        );
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(intent_id = %intent_id, error = %err, "Intent status check aborted");
                        continue;
                    }
                };

                let Some(kind) = terminal_event(intent.status) else {
                    let message = last_error(&intent);
                    if message != last_message && !claimed.load(Ordering::SeqCst) {
                        last_message = message.clone();
                        let _ = events.send(MonitorEvent {
                            generation,
                            intent_id: intent_id.clone(),
                            kind: MonitorEventKind::LastError(message),
                        });
                    }
                    tracing::debug!(intent_id = %intent_id, status = ?intent.status, "Intent still pending");
                    continue;
                };

                if claim(&claimed) {
                    tracing::info!(intent_id = %intent_id, generation, event = ?kind, "Monitor firing");
                    let _ = events.send(MonitorEvent {
                        generation,
                        intent_id,
                        kind,
                    });
                }
                return;
            }
        }
    }
}

/// Event that ends polling for `status`, if any.
fn terminal_event(status: IntentStatus) -> Option<MonitorEventKind> {
    match status {
        IntentStatus::Succeeded => Some(MonitorEventKind::Completed),
        IntentStatus::Canceled => Some(MonitorEventKind::Canceled),
        IntentStatus::RequiresCapture => Some(MonitorEventKind::CaptureRequired),
        _ => None,
    }
}

async fn deadline_timer(
    events: MonitorSender,
    intent_id: IntentId,
    generation: u64,
    after: Duration,
    claimed: Arc<AtomicBool>,
) {
    time::sleep(after).await;
    if claim(&claimed) {
        tracing::warn!(intent_id = %intent_id, generation, "Intent timed out");
        let _ = events.send(MonitorEvent {
            generation,
            intent_id,
            kind: MonitorEventKind::TimedOut,
        });
    }
}
