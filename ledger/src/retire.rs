//! # Retirement Engine
//!
//! Burns VRD tokens and records the carbon offset purchased with them.
//! Retiring is the terminal operation of the token lifecycle: tokens
//! leave circulation permanently, a certificate id is minted, and the
//! record becomes part of the platform's public offset tally.
//!
//! The engine builds the full retirement record up front — certificate,
//! transaction hash, carbon quantity — and hands it to the balance
//! ledger, which performs the balance check and the append under one
//! per-address critical section. An insufficient balance therefore
//! leaves nothing behind: no record, no certificate, no debit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address;
use crate::amount::Amount;
use crate::config::{
    CAR_EMISSIONS_TONS_PER_YEAR, CERTIFICATE_PREFIX, OFFSET_PROVIDER, OFFSET_RATE_TONS_PER_TOKEN,
    TREES_PER_TON,
};
use crate::issuer::TransactionIssuer;
use crate::ledger::{BalanceLedger, LedgerError};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One retirement event: tokens burned, carbon offset purchased.
/// Immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetirementRecord {
    /// Global sequence number, assigned at append time. Monotonic across
    /// all addresses, so it doubles as insertion order.
    pub id: u64,
    pub user_address: String,
    /// Tokens permanently removed from circulation.
    pub tokens_retired: Amount,
    /// Tons of CO2e offset: tokens times the fixed offset rate.
    pub carbon_credits_purchased: Amount,
    /// The offset provider the purchase was placed with.
    pub offset_provider: String,
    /// Shareable certificate id, e.g. `GCS-20260828-1a2b3c4d`.
    pub certificate_id: String,
    pub transaction_hash: String,
    /// Caller-supplied motivation, stored verbatim.
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Environmental equivalents for a quantity of offset CO2. Display
/// figures only — derived with the usual public rules of thumb.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentalImpact {
    pub co2_offset_tons: f64,
    /// Trees whose annual sequestration matches the offset (40 per ton).
    pub equivalent_trees_planted: u64,
    /// Passenger cars taken off the road for a year (4.6 tons each).
    pub equivalent_cars_removed: u64,
}

/// Platform-wide retirement statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarbonStats {
    /// Number of retirement events recorded.
    pub total_offsets: u64,
    pub total_tokens_retired: Amount,
    pub total_carbon_credits_purchased: Amount,
    pub environmental_impact: EnvironmentalImpact,
    /// The ten most recent retirements, newest first.
    pub recent_offsets: Vec<RetirementRecord>,
}

// ---------------------------------------------------------------------------
// RetirementEngine
// ---------------------------------------------------------------------------

/// Coordinates retirements against the balance ledger and answers the
/// read-side queries (history, certificates, platform stats).
pub struct RetirementEngine {
    ledger: Arc<BalanceLedger>,
    issuer: Arc<dyn TransactionIssuer>,
}

impl RetirementEngine {
    pub fn new(ledger: Arc<BalanceLedger>, issuer: Arc<dyn TransactionIssuer>) -> Self {
        Self { ledger, issuer }
    }

    /// Retires tokens and purchases the corresponding carbon offset.
    ///
    /// The offset quantity is `tokens * 0.001` tons of CO2e, computed in
    /// exact fixed-point arithmetic. Fails with
    /// [`LedgerError::InsufficientBalance`] if the address holds fewer
    /// tokens than requested, in which case the ledger is untouched.
    pub fn retire(
        &self,
        user_address: &str,
        token_amount: f64,
        reason: &str,
    ) -> Result<RetirementRecord, LedgerError> {
        address::validate(user_address)?;
        let tokens = Amount::from_decimal(token_amount)?;
        let carbon = tokens.to_carbon_tons();

        let mut record = RetirementRecord {
            id: 0,
            user_address: user_address.to_string(),
            tokens_retired: tokens,
            carbon_credits_purchased: carbon,
            offset_provider: OFFSET_PROVIDER.to_string(),
            certificate_id: self.issuer.new_certificate_id(CERTIFICATE_PREFIX),
            transaction_hash: self.issuer.new_transaction_id(),
            reason: reason.to_string(),
            created_at: Utc::now(),
        };
        record.id = self.ledger.debit(&record)?;
        Ok(record)
    }

    /// Full retirement history for an address, oldest first. Empty for
    /// addresses that never retired anything.
    pub fn get_history(&self, user_address: &str) -> Result<Vec<RetirementRecord>, LedgerError> {
        Ok(self.ledger.store().retirements_for(user_address)?)
    }

    /// Looks up a retirement by its certificate id.
    pub fn certificate(&self, certificate_id: &str) -> Result<RetirementRecord, LedgerError> {
        self.ledger
            .store()
            .retirement_by_certificate(certificate_id)?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("certificate '{}' not found", certificate_id))
            })
    }

    /// Platform-wide statistics, computed by scanning the retirement
    /// records. Totals are exact; the impact equivalents are display
    /// figures.
    pub fn stats(&self) -> Result<CarbonStats, LedgerError> {
        let mut records = self.ledger.store().all_retirements()?;

        let mut total_tokens = Amount::ZERO;
        let mut total_carbon = Amount::ZERO;
        for record in &records {
            total_tokens = total_tokens.checked_add(record.tokens_retired)?;
            total_carbon = total_carbon.checked_add(record.carbon_credits_purchased)?;
        }
        let total_offsets = records.len() as u64;

        let tons = total_carbon.to_decimal();
        let impact = EnvironmentalImpact {
            co2_offset_tons: tons,
            equivalent_trees_planted: (tons * TREES_PER_TON) as u64,
            equivalent_cars_removed: (tons / CAR_EMISSIONS_TONS_PER_YEAR) as u64,
        };

        // Newest first, capped at ten.
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(10);

        Ok(CarbonStats {
            total_offsets,
            total_tokens_retired: total_tokens,
            total_carbon_credits_purchased: total_carbon,
            environmental_impact: impact,
            recent_offsets: records,
        })
    }

    /// The fixed tons-per-token offset rate, for display.
    pub fn offset_rate(&self) -> f64 {
        OFFSET_RATE_TONS_PER_TOKEN
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
