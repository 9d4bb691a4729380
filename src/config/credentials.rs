//! Credential resolution from configuration.
//!
//! The processor secret key comes from the config file or, failing that,
//! from the environment at the moment a client is built.

use super::types::ProcessorConfig;

/// Environment variable consulted when `processor.api_key` is unset.
pub const API_KEY_ENV_VAR: &str = "STRIPE_API_KEY";

/// Wrapper for sensitive strings that prevents accidental logging.
///
/// The inner value is never exposed via Debug or Display traits.
/// Use `expose()` to access the actual value when needed for API calls.
#[derive(Clone)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Expose the inner value.
    ///
    /// Use sparingly and only when actually sending to APIs.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(••••••••)")
    }
}

impl std::fmt::Display for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "••••••••")
    }
}

/// Status of credential resolution for the processor.
#[derive(Debug, Clone)]
pub enum CredentialStatus {
    Configured(SecureString),
    Unconfigured { reason: String },
}

impl ProcessorConfig {
    /// Resolve the secret key from config, then from `$STRIPE_API_KEY`.
    ///
    /// Not cached, so a key exported after startup is picked up by the
    /// next client that gets built.
    pub fn resolve_credential(&self) -> CredentialStatus {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> CredentialStatus {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return CredentialStatus::Configured(SecureString::new(key.clone()));
        }
        match lookup(API_KEY_ENV_VAR).filter(|k| !k.is_empty()) {
            Some(key) => CredentialStatus::Configured(SecureString::new(key)),
            None => CredentialStatus::Unconfigured {
                reason: format!("processor.api_key is not set and ${} is empty", API_KEY_ENV_VAR),
            },
        }
    }
}
