//! Line-oriented view over a checkout session.
//!
//! Reads one command per line and prints the workflow's state whenever
//! it changes. Generic over its input and output so tests can drive it
//! from memory.

use std::fmt::Write as _;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::amount::{format_amount, parse_amount, AmountError};
use crate::terminal::Reader;
use crate::workflow::{Phase, SessionHandle, UserAction, WorkflowState};

pub const HELP: &str = "\
Commands:
  pay              collect a payment for the current amount
  setup            save a card for later use
  amount <value>   set the amount, e.g. amount 12.50
  reader <id>      choose a reader
  readers          list readers
  simulate         present a test card (simulated readers only)
  cancel           cancel the current collection
  ok               acknowledge a completed collection
  retry            start over after an error
  quit             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pay,
    Setup,
    Amount(u64),
    Reader(String),
    Readers,
    Simulate,
    Cancel,
    Ok,
    Retry,
    Help,
    Quit,
}

impl Command {
    /// The workflow action this command sends, if any.
    pub fn action(&self) -> Option<UserAction> {
        match self {
            Command::Pay => Some(UserAction::StartPayment),
            Command::Setup => Some(UserAction::StartSetup),
            Command::Amount(minor) => Some(UserAction::SetAmount(*minor)),
            Command::Reader(id) => Some(UserAction::SelectReader(id.clone())),
            Command::Simulate => Some(UserAction::SimulatePresent),
            Command::Cancel => Some(UserAction::Cancel),
            Command::Ok => Some(UserAction::Acknowledge),
            Command::Retry => Some(UserAction::Retry),
            Command::Readers | Command::Help | Command::Quit => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for a list.")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Amount(#[from] AmountError),
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let rest = words.collect::<Vec<_>>().join(" ");

    let command = match word.to_ascii_lowercase().as_str() {
        "pay" | "p" => Command::Pay,
        "setup" | "s" => Command::Setup,
        "amount" | "a" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("amount"));
            }
            Command::Amount(parse_amount(&rest)?)
        }
        "reader" | "r" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("reader"));
            }
            Command::Reader(rest)
        }
        "readers" | "ls" => Command::Readers,
        "simulate" | "sim" => Command::Simulate,
        "cancel" | "c" => Command::Cancel,
        "ok" => Command::Ok,
        "retry" => Command::Retry,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Text for the current screen.
pub fn render(state: &WorkflowState) -> String {
    let currency = state.settings.currency.to_uppercase();
    let reader = state
        .selected_reader
        .as_ref()
        .map(|r| format!("{} ({})", r.display_name(), r.id))
        .unwrap_or_else(|| "none".to_string());

    let mut out = String::new();
    match state.phase {
        Phase::Loading | Phase::LoadingReaders => out.push_str("Loading readers..."),
        Phase::Ready => {
            let _ = write!(
                out,
                "Ready. Reader: {}. Amount: {} {}.",
                reader,
                format_amount(state.amount),
                currency
            );
            if state.pending.is_some() {
                out.push_str("\nSending to reader...");
            }
        }
        Phase::Charging => {
            let _ = write!(out, "Waiting for card on {}...", reader);
            if state.can_simulate() {
                out.push_str("\nType 'simulate' to present a test card.");
            }
            out.push_str("\nType 'cancel' to stop.");
        }
        Phase::PaymentCollected => {
            let _ = write!(
                out,
                "Payment of {} {} collected. Type 'ok' to continue.",
                format_amount(state.amount),
                currency
            );
        }
        Phase::PaymentMethodCollected => {
            out.push_str("Payment method collected. Type 'ok' to continue.")
        }
        Phase::Canceling => out.push_str("Canceling..."),
        Phase::Error => {
            let _ = write!(out, "Error: {}\nType 'retry' to try again.", state.error);
        }
    }

    if state.phase != Phase::Error && !state.error.is_empty() {
        let _ = write!(out, "\n{}", state.error);
    }
    out
}

pub fn render_readers(readers: &[Reader], selected: Option<&Reader>) -> String {
    if readers.is_empty() {
        return "No readers loaded.".to_string();
    }
    readers
        .iter()
        .map(|reader| {
            let marker = if selected.is_some_and(|s| s.id == reader.id) {
                '*'
            } else {
                ' '
            };
            format!(
                "{} {}  {}  {}",
                marker,
                reader.id,
                reader.display_name(),
                reader.device_type
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drive `session` from `input` until `quit`, end of input, or the session
/// stops. Does not shut the session down.
pub async fn run<R, W>(session: &SessionHandle, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut updates = session.subscribe();
    let mut last_screen = String::new();

    let initial = updates.borrow_and_update().clone();
    show(&mut output, &mut last_screen, &initial).await?;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                show(&mut output, &mut last_screen, &state).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => print(&mut output, HELP).await?,
                    Ok(Some(Command::Readers)) => {
                        let state = session.snapshot();
                        let text = render_readers(&state.readers, state.selected_reader.as_ref());
                        print(&mut output, &text).await?;
                    }
                    Ok(Some(command)) => {
                        if let Some(action) = command.action() {
                            if session.send(action).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => print(&mut output, &err.to_string()).await?,
                }
            }
        }
    }

    output.flush().await
}

async fn show<W: AsyncWrite + Unpin>(
    output: &mut W,
    last_screen: &mut String,
    state: &WorkflowState,
) -> std::io::Result<()> {
    let screen = render(state);
    if screen != *last_screen {
        print(output, &screen).await?;
        *last_screen = screen;
    }
    Ok(())
}

async fn print<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
