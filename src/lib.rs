//! Card-present checkout against networked card readers.
//!
//! A [`workflow::Session`] walks one checkout through reader selection,
//! intent creation, collection on the reader and completion, pushing work
//! to the reader through the relay ([`terminal`]) and watching the intent
//! at the processor ([`intent`], [`monitor`]).

pub mod amount;
pub mod config;
pub mod console;
pub mod error;
pub mod intent;
pub mod logging;
pub mod monitor;
pub mod mvi;
pub mod processor;
pub mod relay;
pub mod terminal;
pub mod workflow;
