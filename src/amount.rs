//! Decimal amount entry.
//!
//! Turns what a person types ("12.50", "3", "0.5") into integer minor
//! units. No currency rules beyond two fraction digits.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),
    #[error("Amount must be greater than zero")]
    Zero,
    #[error("Amount '{0}' is too large")]
    Overflow(String),
}

/// Parse a decimal amount into minor units (`"12.50"` → `1250`).
pub fn parse_amount(input: &str) -> Result<u64, AmountError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction)
    {
        return Err(AmountError::NotANumber(text.to_string()));
    }
    if fraction.len() > 2 {
        return Err(AmountError::TooPrecise(text.to_string()));
    }

    let overflow = || AmountError::Overflow(text.to_string());
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let cents: u64 = format!("{:0<2}", fraction).parse().map_err(|_| overflow())?;

    let minor = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(overflow)?;

    if minor == 0 {
        return Err(AmountError::Zero);
    }
    Ok(minor)
}

/// Render minor units back as a decimal string (`1250` → `"12.50"`).
pub fn format_amount(minor: u64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}
