//! # Transaction & Certificate Issuance
//!
//! Every wrap and every retirement gets a receipt: a transaction hash
//! surrogate (`0x`-prefixed, Ethereum-shaped) and, for retirements, a
//! human-shareable certificate id (`GCS-20260828-1a2b3c4d`).
//!
//! Issuance is a capability behind the [`TransactionIssuer`] trait so a
//! real chain submitter can be swapped in later without touching the
//! ledger's contract. The default [`MockChainIssuer`] derives ids from a
//! SHA-256 over a process-local counter plus a fresh UUID — the counter
//! makes every input distinct within the process lifetime, the UUID
//! makes ids distinct across restarts.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TransactionIssuer
// ---------------------------------------------------------------------------

/// Capability for generating unique receipt identifiers.
///
/// Implementations must never return the same id twice within a process
/// lifetime. They must not block — id generation sits inside the
/// per-address critical section.
pub trait TransactionIssuer: Send + Sync {
    /// A new transaction hash surrogate: `0x` + 40 lowercase hex chars.
    fn new_transaction_id(&self) -> String;

    /// A new certificate id: `{prefix}-{YYYYMMDD}-{8 hex chars}`.
    fn new_certificate_id(&self, prefix: &str) -> String;
}

// ---------------------------------------------------------------------------
// MockChainIssuer
// ---------------------------------------------------------------------------

/// Default issuer: simulates chain receipts without any chain.
///
/// Ids are the first bytes of `SHA-256(counter || uuid)`. The atomic
/// counter guarantees distinct hash inputs per call, so collisions
/// require a SHA-256 collision — effectively zero probability.
#[derive(Debug, Default)]
pub struct MockChainIssuer {
    counter: AtomicU64,
}

impl MockChainIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One hash per call, salted with the next counter value.
    fn next_digest(&self) -> [u8; 32] {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(seq.to_be_bytes());
        hasher.update(Uuid::new_v4().as_bytes());
        hasher.finalize().into()
    }
}

impl TransactionIssuer for MockChainIssuer {
    fn new_transaction_id(&self) -> String {
        // 20 bytes -> 40 hex chars, same shape as an Ethereum tx hash
        // truncated to address length (matches the upstream mock format).
        let digest = self.next_digest();
        format!("0x{}", hex::encode(&digest[..20]))
    }

    fn new_certificate_id(&self, prefix: &str) -> String {
        let digest = self.next_digest();
        let date = Utc::now().format("%Y%m%d");
        format!("{}-{}-{}", prefix, date, hex::encode(&digest[..4]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn transaction_id_has_eth_shape() {
        let issuer = MockChainIssuer::new();
        let id = issuer.new_transaction_id();
        assert_eq!(id.len(), 42);
        assert!(id.starts_with("0x"));
        assert!(id[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn certificate_id_has_documented_shape() {
        let issuer = MockChainIssuer::new();
        let id = issuer.new_certificate_id("GCS");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "GCS");
        assert_eq!(parts[1].len(), 8); // YYYYMMDD
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn transaction_ids_never_repeat() {
        let issuer = MockChainIssuer::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(issuer.new_transaction_id()));
        }
    }

    #[test]
    fn certificate_ids_never_repeat() {
        let issuer = MockChainIssuer::new();
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            assert!(seen.insert(issuer.new_certificate_id("GCS")));
        }
    }

    #[test]
    fn issuers_are_independent() {
        // Two issuers share no state; ids still differ thanks to the UUID salt.
        let a = MockChainIssuer::new();
        let b = MockChainIssuer::new();
        assert_ne!(a.new_transaction_id(), b.new_transaction_id());
    }
}
