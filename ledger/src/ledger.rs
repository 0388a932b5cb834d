//! # Balance Ledger
//!
//! The single authority over token balances. Credits come in through
//! [`BalanceLedger::wrap`], tokens leave through [`BalanceLedger::debit`]
//! (called only by the retirement engine), and every movement appends an
//! immutable record. No other component writes wrap or retirement
//! records — the ledger owns both collections.
//!
//! ## Concurrency
//!
//! Mutations serialize per address: a striped lock map hands out one
//! mutex per address, taken only for the read-check-append critical
//! section. Proof verification and amount validation run before the lock
//! so a slow verifier never stalls other callers, and operations on
//! different addresses never contend at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{self, AddressError};
use crate::amount::{Amount, AmountError};
use crate::issuer::TransactionIssuer;
use crate::registry::{ProviderRegistry, RegistryError};
use crate::retire::RetirementRecord;
use crate::store::{LedgerStore, StoreError};
use crate::verifier::{CredentialVerifier, ProofError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by ledger operations. Each variant maps onto one API
/// failure mode, so the HTTP layer can translate mechanically.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    /// The address holds fewer tokens than the retirement asks for.
    #[error("insufficient token balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Amount,
        requested: Amount,
    },

    /// The requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One wrap event: provider credits converted into VRD tokens.
/// Immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WrappedCreditRecord {
    /// Address the tokens were issued to.
    pub user_address: String,
    /// Provider id the credits came from, e.g. `"openai"`.
    pub provider: String,
    /// Credits surrendered, in provider units.
    pub credit_amount: Amount,
    /// Tokens issued (credits times the provider's conversion rate).
    pub tokens_issued: Amount,
    /// The ownership proof the caller presented. Retained verbatim so an
    /// audit can re-examine it.
    pub proof: String,
    /// Receipt id for this wrap.
    pub transaction_hash: String,
    pub created_at: DateTime<Utc>,
}

/// An address's balance together with its full wrap history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub user_address: String,
    pub total_balance: Amount,
    pub wrapped_credits: Vec<WrappedCreditRecord>,
}

// ---------------------------------------------------------------------------
// BalanceLedger
// ---------------------------------------------------------------------------

/// The balance ledger. Cheap to share: wrap it in an `Arc` and clone the
/// handle across tasks.
pub struct BalanceLedger {
    store: Arc<LedgerStore>,
    registry: Arc<ProviderRegistry>,
    verifier: Arc<dyn CredentialVerifier>,
    issuer: Arc<dyn TransactionIssuer>,
    /// One mutex per address, created on first touch. Entries are never
    /// removed; the set of active addresses is bounded in practice.
    address_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BalanceLedger {
    pub fn new(
        store: Arc<LedgerStore>,
        registry: Arc<ProviderRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
        issuer: Arc<dyn TransactionIssuer>,
    ) -> Self {
        Self {
            store,
            registry,
            verifier,
            issuer,
            address_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, address: &str) -> Arc<Mutex<()>> {
        self.address_locks
            .entry(address.to_string())
            .or_default()
            .clone()
    }

    /// Wraps provider credits into VRD tokens.
    ///
    /// Validation order matches the API contract: provider first, then
    /// amount, then proof. All of it happens before the per-address lock;
    /// a rejected request leaves no trace in the ledger.
    pub fn wrap(
        &self,
        user_address: &str,
        provider_id: &str,
        credit_amount: f64,
        proof: &str,
    ) -> Result<WrappedCreditRecord, LedgerError> {
        address::validate(user_address)?;
        let provider = self.registry.get(provider_id)?;
        let credits = Amount::from_decimal(credit_amount)?;
        self.verifier.verify(provider_id, credits, proof)?;
        let tokens = credits.convert(provider.conversion_rate)?;

        let record = WrappedCreditRecord {
            user_address: user_address.to_string(),
            provider: provider.id.clone(),
            credit_amount: credits,
            tokens_issued: tokens,
            proof: proof.to_string(),
            transaction_hash: self.issuer.new_transaction_id(),
            created_at: Utc::now(),
        };

        let lock = self.lock_for(user_address);
        let _guard = lock.lock();
        let balance = self.store.balance(user_address)?;
        let new_balance = balance.checked_add(tokens)?;
        self.store.append_wrap(&record, new_balance)?;

        tracing::info!(
            address = %record.user_address,
            provider = %record.provider,
            credits = %record.credit_amount,
            tokens = %record.tokens_issued,
            tx = %record.transaction_hash,
            "wrapped credits"
        );
        Ok(record)
    }

    /// Current balance and wrap history for an address.
    ///
    /// Reads never fail on unknown addresses: a fresh address is simply
    /// an address with a zero balance and no history. Reads take no lock
    /// and mutate nothing.
    pub fn get_balance(&self, user_address: &str) -> Result<BalanceSummary, LedgerError> {
        Ok(BalanceSummary {
            user_address: user_address.to_string(),
            total_balance: self.store.balance(user_address)?,
            wrapped_credits: self.store.wraps_for(user_address)?,
        })
    }

    /// Debits tokens for a retirement and appends the record, atomically.
    /// Returns the sequence id assigned to the stored record.
    ///
    /// Called only by [`crate::RetirementEngine`]; the record arrives
    /// fully built so the balance check and the append share one critical
    /// section.
    pub(crate) fn debit(&self, record: &RetirementRecord) -> Result<u64, LedgerError> {
        let lock = self.lock_for(&record.user_address);
        let _guard = lock.lock();
        let balance = self.store.balance(&record.user_address)?;
        let new_balance = balance.checked_sub(record.tokens_retired).ok_or(
            LedgerError::InsufficientBalance {
                available: balance,
                requested: record.tokens_retired,
            },
        )?;
        let id = self.store.append_retirement(record, new_balance)?;

        tracing::info!(
            address = %record.user_address,
            tokens = %record.tokens_retired,
            carbon = %record.carbon_credits_purchased,
            certificate = %record.certificate_id,
            "retired tokens"
        );
        Ok(id)
    }

    /// Shared handle to the underlying store, for read-only collaborators.
    pub(crate) fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    /// The provider registry this ledger converts against.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::MockChainIssuer;
    use crate::verifier::MockVerifier;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const PROOF: &str = "test_proof_12345";

    fn test_ledger() -> BalanceLedger {
        BalanceLedger::new(
            Arc::new(LedgerStore::open_temporary().unwrap()),
            Arc::new(ProviderRegistry::with_defaults()),
            Arc::new(MockVerifier),
            Arc::new(MockChainIssuer::new()),
        )
    }

    #[test]
    fn wrap_issues_tokens_at_par() {
        let ledger = test_ledger();
        let record = ledger.wrap(ALICE, "openai", 100.0, PROOF).unwrap();

        assert_eq!(record.tokens_issued, Amount::from_whole(100));
        assert_eq!(record.credit_amount, Amount::from_whole(100));
        assert_eq!(record.provider, "openai");
        assert!(record.transaction_hash.starts_with("0x"));
        assert_eq!(record.transaction_hash.len(), 42);

        let summary = ledger.get_balance(ALICE).unwrap();
        assert_eq!(summary.total_balance, Amount::from_whole(100));
        assert_eq!(summary.wrapped_credits.len(), 1);
    }

    #[test]
    fn wrap_accumulates_balance() {
        let ledger = test_ledger();
        ledger.wrap(ALICE, "openai", 100.0, PROOF).unwrap();
        ledger.wrap(ALICE, "anthropic", 50.0, PROOF).unwrap();

        let summary = ledger.get_balance(ALICE).unwrap();
        assert_eq!(summary.total_balance, Amount::from_whole(150));
        assert_eq!(summary.wrapped_credits.len(), 2);
        assert_eq!(summary.wrapped_credits[0].provider, "openai");
        assert_eq!(summary.wrapped_credits[1].provider, "anthropic");
    }

    #[test]
    fn wrap_rejects_unknown_provider() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.wrap(ALICE, "midjourney", 100.0, PROOF),
            Err(LedgerError::Registry(RegistryError::UnknownProvider(_)))
        ));
        assert!(ledger.get_balance(ALICE).unwrap().total_balance.is_zero());
    }

    #[test]
    fn wrap_rejects_bad_address() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.wrap("not-an-address", "openai", 100.0, PROOF),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn wrap_rejects_non_positive_amount() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.wrap(ALICE, "openai", 0.0, PROOF),
            Err(LedgerError::InvalidAmount(AmountError::NotPositive))
        ));
        assert!(matches!(
            ledger.wrap(ALICE, "openai", -10.0, PROOF),
            Err(LedgerError::InvalidAmount(AmountError::NotPositive))
        ));
    }

    #[test]
    fn wrap_rejects_short_proof_without_mutation() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.wrap(ALICE, "openai", 100.0, "short"),
            Err(LedgerError::Proof(ProofError::InvalidProof))
        ));
        let summary = ledger.get_balance(ALICE).unwrap();
        assert!(summary.total_balance.is_zero());
        assert!(summary.wrapped_credits.is_empty());
    }

    #[test]
    fn fresh_address_reads_zero_and_empty() {
        let ledger = test_ledger();
        let summary = ledger.get_balance(BOB).unwrap();
        assert_eq!(summary.total_balance, Amount::ZERO);
        assert!(summary.wrapped_credits.is_empty());

        // Reading is not a mutation: repeat reads are identical.
        let again = ledger.get_balance(BOB).unwrap();
        assert_eq!(again.total_balance, Amount::ZERO);
        assert!(again.wrapped_credits.is_empty());
    }

    #[test]
    fn balances_are_per_address() {
        let ledger = test_ledger();
        ledger.wrap(ALICE, "openai", 100.0, PROOF).unwrap();
        ledger.wrap(BOB, "google", 25.0, PROOF).unwrap();

        assert_eq!(
            ledger.get_balance(ALICE).unwrap().total_balance,
            Amount::from_whole(100)
        );
        assert_eq!(
            ledger.get_balance(BOB).unwrap().total_balance,
            Amount::from_whole(25)
        );
    }

    #[test]
    fn wrap_transaction_hashes_are_unique() {
        let ledger = test_ledger();
        let a = ledger.wrap(ALICE, "openai", 1.0, PROOF).unwrap();
        let b = ledger.wrap(ALICE, "openai", 1.0, PROOF).unwrap();
        assert_ne!(a.transaction_hash, b.transaction_hash);
    }

    #[test]
    fn concurrent_wraps_all_land() {
        let ledger = Arc::new(test_ledger());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    ledger.wrap(ALICE, "openai", 1.0, PROOF).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = ledger.get_balance(ALICE).unwrap();
        assert_eq!(summary.total_balance, Amount::from_whole(200));
        assert_eq!(summary.wrapped_credits.len(), 200);
    }
}
