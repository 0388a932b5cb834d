//! # Provider Registry
//!
//! The static catalog of AI-credit providers whose credits can be wrapped
//! into VRD tokens. Seeded once at startup and read-only thereafter —
//! adding a provider is a deploy, not an API call.
//!
//! Each provider carries a conversion rate (tokens issued per unit of
//! credit). Every documented provider converts 1:1 today, but the rate
//! is stored per-provider so that a future non-par listing doesn't
//! require a schema change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::{Amount, AmountError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by registry lookups and conversions.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested provider id is not registered (or not active).
    #[error("provider '{0}' not supported")]
    UnknownProvider(String),

    /// The credit amount failed validation (non-positive, non-finite).
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// A supported AI-credit provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provider {
    /// Stable lowercase identifier, e.g. `"openai"`. Unique key.
    #[serde(rename = "name")]
    pub id: String,

    /// Human-readable name for UI display, e.g. `"OpenAI"`.
    pub display_name: String,

    /// Whether the provider currently accepts wraps. Inactive providers
    /// stay listed in storage but are invisible to the API.
    pub is_active: bool,

    /// Tokens issued per unit of credit.
    pub conversion_rate: Amount,
}

impl Provider {
    /// Creates an active provider with the given conversion rate.
    pub fn new(id: &str, display_name: &str, conversion_rate: Amount) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            is_active: true,
            conversion_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// Read-only catalog of providers, keyed by id.
#[derive(Clone, Debug)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    /// Builds a registry from an explicit provider list. Later entries
    /// with a duplicate id replace earlier ones.
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    /// The default seed set: the providers the platform launched with,
    /// all converting 1:1.
    pub fn with_defaults() -> Self {
        let par = Amount::from_whole(1);
        Self::new([
            Provider::new("openai", "OpenAI", par),
            Provider::new("anthropic", "Anthropic", par),
            Provider::new("google", "Google AI", par),
        ])
    }

    /// Looks up an active provider by id.
    pub fn get(&self, id: &str) -> Result<&Provider, RegistryError> {
        self.providers
            .get(id)
            .filter(|p| p.is_active)
            .ok_or_else(|| RegistryError::UnknownProvider(id.to_string()))
    }

    /// Converts a caller-supplied credit amount into tokens using the
    /// provider's conversion rate.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownProvider`] if `id` is not registered.
    /// - [`RegistryError::InvalidAmount`] if the amount is non-positive
    ///   or non-finite.
    pub fn convert(&self, id: &str, credit_amount: f64) -> Result<Amount, RegistryError> {
        let provider = self.get(id)?;
        let credits = Amount::from_decimal(credit_amount)?;
        Ok(credits.convert(provider.conversion_rate)?)
    }

    /// All active providers, ordered by id.
    pub fn active(&self) -> Vec<&Provider> {
        self.providers.values().filter(|p| p.is_active).collect()
    }

    /// Total number of registered providers, active or not.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
