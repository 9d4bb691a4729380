//! State for the checkout workflow.

use std::fmt;

use crate::intent::{CaptureMethod, IntentId, IntentKind};
use crate::mvi::ViewState;
use crate::terminal::Reader;

pub const DEFAULT_AMOUNT: u64 = 100;

/// Which screen the workflow is on. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Loading,
    LoadingReaders,
    Ready,
    Charging,
    PaymentCollected,
    PaymentMethodCollected,
    Canceling,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::LoadingReaders => "loading-readers",
            Phase::Ready => "ready",
            Phase::Charging => "charging",
            Phase::PaymentCollected => "payment-collected",
            Phase::PaymentMethodCollected => "payment-method-collected",
            Phase::Canceling => "canceling",
            Phase::Error => "error",
        }
    }

    /// Phases the user leaves by acknowledging.
    pub fn is_collected(&self) -> bool {
        matches!(self, Phase::PaymentCollected | Phase::PaymentMethodCollected)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-wide settings the reducer needs to build requests.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub reader_limit: u32,
    pub currency: String,
    pub customer: Option<String>,
    pub capture_method: CaptureMethod,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            reader_limit: 5,
            currency: "usd".to_string(),
            customer: None,
            capture_method: CaptureMethod::Automatic,
        }
    }
}

/// Intent being pushed to the reader; the workflow is still `Ready`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingStart {
    pub kind: IntentKind,
    /// Set once the processor has created the intent.
    pub intent_id: Option<IntentId>,
}

/// Intent the reader is currently collecting for.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveIntent {
    pub id: IntentId,
    pub kind: IntentKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub phase: Phase,
    pub readers: Vec<Reader>,
    pub selected_reader: Option<Reader>,
    /// Shown by the view; empty when there is nothing to report.
    pub error: String,
    pub active_intent: Option<ActiveIntent>,
    /// Minor units.
    pub amount: u64,
    pub pending: Option<PendingStart>,
    /// Generation of the monitor schedule that may deliver events.
    pub schedule: Option<u64>,
    pub settings: WorkflowSettings,
    pub(super) next_generation: u64,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new(WorkflowSettings::default(), DEFAULT_AMOUNT)
    }
}

impl ViewState for WorkflowState {}

impl WorkflowState {
    pub fn new(settings: WorkflowSettings, amount: u64) -> Self {
        Self {
            phase: Phase::Loading,
            readers: Vec::new(),
            selected_reader: None,
            error: String::new(),
            active_intent: None,
            amount,
            pending: None,
            schedule: None,
            settings,
            next_generation: 1,
        }
    }

    pub fn active_intent_id(&self) -> Option<&IntentId> {
        self.active_intent.as_ref().map(|a| &a.id)
    }

    /// Whether the view should offer the simulate-present action.
    pub fn can_simulate(&self) -> bool {
        self.phase == Phase::Charging
            && self
                .selected_reader
                .as_ref()
                .is_some_and(|r| r.is_simulated())
    }

    /// Active intent iff charging; live schedule iff active intent.
    pub fn invariants_hold(&self) -> bool {
        let charging = self.phase == Phase::Charging;
        charging == self.active_intent.is_some()
            && self.schedule.is_some() == self.active_intent.is_some()
    }

    pub(super) fn take_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(device_type: &str) -> Reader {
        Reader {
            id: "tmr_1".to_string(),
            label: None,
            device_type: device_type.to_string(),
            status: None,
            serial_number: None,
        }
    }

    #[test]
    fn loading_is_default() {
        let state = WorkflowState::default();
        assert_eq!(state.phase, Phase::Loading);
        assert_eq!(state.amount, DEFAULT_AMOUNT);
        assert!(state.invariants_hold());
    }

    #[test]
    fn phase_tags_match_view_names() {
        assert_eq!(Phase::LoadingReaders.as_str(), "loading-readers");
        assert_eq!(Phase::PaymentMethodCollected.to_string(), "payment-method-collected");
        assert!(Phase::PaymentCollected.is_collected());
        assert!(!Phase::Charging.is_collected());
    }

    #[test]
    fn generations_increase() {
        let mut state = WorkflowState::default();
        let first = state.take_generation();
        let second = state.take_generation();
        assert!(second > first);
    }

    #[test]
    fn simulate_only_on_simulated_reader_while_charging() {
        let mut state = WorkflowState::default();
        state.selected_reader = Some(reader("simulated_wisepos_e"));
        assert!(!state.can_simulate());

        state.phase = Phase::Charging;
        assert!(state.can_simulate());

        state.selected_reader = Some(reader("bbpos_wisepos_e"));
        assert!(!state.can_simulate());
    }

    #[test]
    fn charging_without_intent_breaks_invariant() {
        let mut state = WorkflowState::default();
        state.phase = Phase::Charging;
        assert!(!state.invariants_hold());
    }
}
