//! Intents and effects for the checkout workflow.

use crate::intent::{CreateIntent, IntentId, IntentKind};
use crate::monitor::MonitorEvent;
use crate::mvi::Intent;
use crate::terminal::{Reader, ReaderListParams};

/// Everything that can move the workflow. Results of effects carry their
/// error as display text; the typed error is logged where it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowIntent {
    /// Entry action of `Loading`.
    Load,
    ReadersLoaded(Result<Vec<Reader>, String>),
    SelectReader {
        reader_id: String,
    },
    SetAmount {
        minor_units: u64,
    },
    StartPayment,
    StartSetup,
    IntentCreated {
        kind: IntentKind,
        result: Result<IntentId, String>,
    },
    IntentPushed {
        intent_id: IntentId,
        result: Result<(), String>,
    },
    Monitor(MonitorEvent),
    CaptureFinished {
        intent_id: IntentId,
        result: Result<(), String>,
    },
    SimulatePresent,
    SimulateFinished(Result<(), String>),
    /// Run the reset protocol from whatever phase we are in.
    Cancel,
    ResetComplete,
    Acknowledge,
    Retry,
}

impl Intent for WorkflowIntent {}

/// Actions a view may send into a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SelectReader(String),
    SetAmount(u64),
    StartPayment,
    StartSetup,
    Cancel,
    Retry,
    Acknowledge,
    SimulatePresent,
}

impl From<UserAction> for WorkflowIntent {
    fn from(action: UserAction) -> Self {
        match action {
            UserAction::SelectReader(reader_id) => WorkflowIntent::SelectReader { reader_id },
            UserAction::SetAmount(minor_units) => WorkflowIntent::SetAmount { minor_units },
            UserAction::StartPayment => WorkflowIntent::StartPayment,
            UserAction::StartSetup => WorkflowIntent::StartSetup,
            UserAction::Cancel => WorkflowIntent::Cancel,
            UserAction::Retry => WorkflowIntent::Retry,
            UserAction::Acknowledge => WorkflowIntent::Acknowledge,
            UserAction::SimulatePresent => WorkflowIntent::SimulatePresent,
        }
    }
}

/// Side effects requested by the reducer, run by the session runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ListReaders(ReaderListParams),
    CreateIntent(CreateIntent),
    PushToReader {
        reader: String,
        intent_id: IntentId,
        kind: IntentKind,
    },
    ArmMonitor {
        intent_id: IntentId,
        generation: u64,
    },
    DisarmMonitor,
    Capture {
        intent_id: IntentId,
    },
    /// Best effort; failure is only logged.
    CancelReaderAction {
        reader: String,
    },
    /// Best effort; failure is only logged.
    CancelIntent {
        intent_id: IntentId,
    },
    SimulatePresent {
        reader: String,
    },
    CompleteReset,
}
