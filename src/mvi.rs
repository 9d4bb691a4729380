//! Unidirectional state machine primitives.
//!
//! ```text
//! Intent ──→ Reducer ──→ (State, Effects) ──→ observers
//!    ↑                        │
//!    └──── effect results ────┘
//! ```
//!
//! A reducer never performs I/O. It hands back effects and the runtime
//! feeds their outcomes in again as intents.

/// Snapshot type published after every reduction.
pub trait ViewState: Clone + PartialEq + Default + Send + 'static {}

/// Anything a reducer accepts: user actions and effect results alike.
pub trait Intent: Send + 'static {}

/// Next state plus the effects to run, in order.
pub type Transition<S, E> = (S, Vec<E>);

pub trait Reducer {
    type State: ViewState;
    type Intent: Intent;
    type Effect;

    /// `(State, Intent) -> (State, Effects)`, with no side effects.
    fn reduce(state: Self::State, intent: Self::Intent) -> Transition<Self::State, Self::Effect>;
}
