//! Reducer for the checkout workflow.

use crate::intent::{CreateIntent, IntentId, IntentKind, PaymentIntentParams, SetupIntentParams};
use crate::monitor::{MonitorEvent, MonitorEventKind};
use crate::mvi::{Reducer, Transition};
use crate::terminal::ReaderListParams;

use super::intent::{Effect, WorkflowIntent};
use super::state::{ActiveIntent, Phase, PendingStart, WorkflowState};

pub const NO_READERS: &str = "No online readers were found.";
pub const READERS_FAILED: &str =
    "Could not load readers due to API error. Check the console logs for more detail.";
pub const NO_READER_SELECTED: &str = "Select a reader before starting.";

/// Reducer for workflow state transitions.
///
/// Pure: network calls, timers and logging are done by the runtime from
/// the returned effects.
pub struct WorkflowReducer;

type Step = Transition<WorkflowState, Effect>;

impl Reducer for WorkflowReducer {
    type State = WorkflowState;
    type Intent = WorkflowIntent;
    type Effect = Effect;

    fn reduce(mut state: Self::State, intent: Self::Intent) -> Step {
        match intent {
            WorkflowIntent::Load => {
                if state.phase != Phase::Loading {
                    return (state, vec![]);
                }
                state.error.clear();
                state.phase = Phase::LoadingReaders;
                let params = ReaderListParams::online(state.settings.reader_limit);
                (state, vec![Effect::ListReaders(params)])
            }

            WorkflowIntent::ReadersLoaded(result) => {
                if state.phase != Phase::LoadingReaders {
                    return (state, vec![]);
                }
                match result {
                    Ok(readers) if !readers.is_empty() => {
                        state.selected_reader = readers.first().cloned();
                        state.readers = readers;
                        state.phase = Phase::Ready;
                        (state, vec![])
                    }
                    Ok(_) => {
                        state.readers.clear();
                        state.selected_reader = None;
                        fail(state, NO_READERS.to_string())
                    }
                    Err(_) => {
                        state.readers.clear();
                        state.selected_reader = None;
                        fail(state, READERS_FAILED.to_string())
                    }
                }
            }

            WorkflowIntent::SelectReader { reader_id } => {
                if state.phase == Phase::Ready && state.pending.is_none() {
                    if let Some(reader) = state.readers.iter().find(|r| r.id == reader_id) {
                        state.selected_reader = Some(reader.clone());
                    }
                }
                (state, vec![])
            }

            WorkflowIntent::SetAmount { minor_units } => {
                if minor_units > 0 && state.phase != Phase::Charging && state.pending.is_none() {
                    state.amount = minor_units;
                }
                (state, vec![])
            }

            WorkflowIntent::StartPayment => start(state, IntentKind::Payment),
            WorkflowIntent::StartSetup => start(state, IntentKind::Setup),

            WorkflowIntent::IntentCreated { kind, result } => intent_created(state, kind, result),

            WorkflowIntent::IntentPushed { intent_id, result } => {
                intent_pushed(state, intent_id, result)
            }

            WorkflowIntent::Monitor(event) => monitor_event(state, event),

            WorkflowIntent::CaptureFinished { intent_id, result } => {
                if state.phase != Phase::Charging || state.active_intent_id() != Some(&intent_id) {
                    return (state, vec![]);
                }
                match result {
                    Ok(()) => {
                        // Keep polling under the generation reserved at capture time.
                        let generation = match state.schedule {
                            Some(generation) => generation,
                            None => {
                                let generation = state.take_generation();
                                state.schedule = Some(generation);
                                generation
                            }
                        };
                        (
                            state,
                            vec![Effect::ArmMonitor {
                                intent_id,
                                generation,
                            }],
                        )
                    }
                    Err(message) => fail(state, format!("Unable to capture payment: {}", message)),
                }
            }

            WorkflowIntent::SimulatePresent => {
                if !state.can_simulate() {
                    return (state, vec![]);
                }
                let effects = state
                    .selected_reader
                    .as_ref()
                    .map(|reader| Effect::SimulatePresent {
                        reader: reader.id.clone(),
                    })
                    .into_iter()
                    .collect();
                (state, effects)
            }

            WorkflowIntent::SimulateFinished(result) => {
                if let (Phase::Charging, Err(message)) = (state.phase, result) {
                    state.error = message;
                }
                (state, vec![])
            }

            WorkflowIntent::Cancel => reset(state),

            WorkflowIntent::ResetComplete => {
                if state.phase == Phase::Canceling {
                    state.phase = Phase::Loading;
                }
                (state, vec![])
            }

            WorkflowIntent::Acknowledge => {
                if state.phase.is_collected() {
                    state.phase = Phase::Loading;
                }
                (state, vec![])
            }

            WorkflowIntent::Retry => {
                if state.phase == Phase::Error {
                    state.error.clear();
                    state.phase = Phase::Loading;
                }
                (state, vec![])
            }
        }
    }
}

fn start(mut state: WorkflowState, kind: IntentKind) -> Step {
    if state.phase != Phase::Ready || state.pending.is_some() {
        return (state, vec![]);
    }
    if state.selected_reader.is_none() {
        return fail(state, NO_READER_SELECTED.to_string());
    }

    let customer = state.settings.customer.clone();
    let request = match kind {
        IntentKind::Payment => CreateIntent::Payment(PaymentIntentParams {
            amount: state.amount,
            currency: state.settings.currency.clone(),
            customer,
            capture_method: state.settings.capture_method,
        }),
        IntentKind::Setup => CreateIntent::Setup(SetupIntentParams {
            customer,
            usage: "off_session".to_string(),
        }),
    };

    state.error.clear();
    state.pending = Some(PendingStart {
        kind,
        intent_id: None,
    });
    (state, vec![Effect::CreateIntent(request)])
}

fn intent_created(
    mut state: WorkflowState,
    kind: IntentKind,
    result: Result<IntentId, String>,
) -> Step {
    let expected = matches!(
        &state.pending,
        Some(PendingStart { kind: k, intent_id: None }) if *k == kind
    ) && state.phase == Phase::Ready;

    if !expected {
        // Nobody is waiting for this intent any more.
        let effects = match result {
            Ok(intent_id) => vec![Effect::CancelIntent { intent_id }],
            Err(_) => vec![],
        };
        return (state, effects);
    }

    match result {
        Ok(intent_id) => {
            let Some(reader) = state.selected_reader.as_ref().map(|r| r.id.clone()) else {
                state.pending = None;
                let (state, mut effects) = fail(state, NO_READER_SELECTED.to_string());
                effects.push(Effect::CancelIntent { intent_id });
                return (state, effects);
            };
            state.pending = Some(PendingStart {
                kind,
                intent_id: Some(intent_id.clone()),
            });
            (
                state,
                vec![Effect::PushToReader {
                    reader,
                    intent_id,
                    kind,
                }],
            )
        }
        Err(message) => {
            state.pending = None;
            let text = match kind {
                IntentKind::Payment => format!("Unable to start a payment intent: {}", message),
                IntentKind::Setup => "Unable to start a setup intent.".to_string(),
            };
            fail(state, text)
        }
    }
}

fn intent_pushed(mut state: WorkflowState, intent_id: IntentId, result: Result<(), String>) -> Step {
    let kind = match &state.pending {
        Some(PendingStart {
            kind,
            intent_id: Some(id),
        }) if *id == intent_id => *kind,
        _ => return (state, vec![]),
    };
    state.pending = None;

    match result {
        Ok(()) => {
            let generation = state.take_generation();
            state.active_intent = Some(ActiveIntent {
                id: intent_id.clone(),
                kind,
            });
            state.schedule = Some(generation);
            state.phase = Phase::Charging;
            state.error.clear();
            (
                state,
                vec![Effect::ArmMonitor {
                    intent_id,
                    generation,
                }],
            )
        }
        Err(_) => {
            let (state, mut effects) = fail(state, format!("Unable to send {} intent to reader.", kind));
            effects.push(Effect::CancelIntent { intent_id });
            (state, effects)
        }
    }
}

fn monitor_event(mut state: WorkflowState, event: MonitorEvent) -> Step {
    let current = state.phase == Phase::Charging
        && state.schedule == Some(event.generation)
        && state.active_intent_id() == Some(&event.intent_id);
    if !current {
        return (state, vec![]);
    }

    match event.kind {
        MonitorEventKind::LastError(message) => {
            state.error = message;
            (state, vec![])
        }
        MonitorEventKind::Completed => {
            let kind = state.active_intent.take().map(|a| a.kind);
            state.schedule = None;
            state.error.clear();
            state.phase = match kind {
                Some(IntentKind::Setup) => Phase::PaymentMethodCollected,
                _ => Phase::PaymentCollected,
            };
            (state, vec![Effect::DisarmMonitor])
        }
        MonitorEventKind::Canceled | MonitorEventKind::TimedOut => reset(state),
        MonitorEventKind::CaptureRequired => {
            // Reserve the next generation now; events from the old one are stale.
            let generation = state.take_generation();
            state.schedule = Some(generation);
            (
                state,
                vec![
                    Effect::DisarmMonitor,
                    Effect::Capture {
                        intent_id: event.intent_id,
                    },
                ],
            )
        }
    }
}

/// Drop every outstanding resource and return the effects that release
/// them remotely. `cancel_reader` forces a reader cancel even without an
/// active intent.
fn teardown(state: &mut WorkflowState, cancel_reader: bool) -> Vec<Effect> {
    let mut effects = Vec::new();
    if state.schedule.take().is_some() || cancel_reader {
        effects.push(Effect::DisarmMonitor);
    }

    let active = state.active_intent.take();
    if cancel_reader || active.is_some() {
        if let Some(reader) = &state.selected_reader {
            effects.push(Effect::CancelReaderAction {
                reader: reader.id.clone(),
            });
        }
    }
    if let Some(active) = active {
        effects.push(Effect::CancelIntent {
            intent_id: active.id,
        });
    }
    if let Some(PendingStart {
        intent_id: Some(intent_id),
        ..
    }) = state.pending.take()
    {
        effects.push(Effect::CancelIntent { intent_id });
    }
    effects
}

/// Reset protocol: release everything, pass through `Canceling`, land in
/// `Loading`. Safe to run from any phase, any number of times.
fn reset(mut state: WorkflowState) -> Step {
    let mut effects = teardown(&mut state, true);
    effects.push(Effect::CompleteReset);
    state.phase = Phase::Canceling;
    (state, effects)
}

/// Move to `Error` with `message`, releasing anything still held.
fn fail(mut state: WorkflowState, message: String) -> Step {
    let effects = teardown(&mut state, false);
    state.error = message;
    state.phase = Phase::Error;
    (state, effects)
}
