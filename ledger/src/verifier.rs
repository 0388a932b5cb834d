//! # Credential Verification
//!
//! Before credits are wrapped, the caller asserts ownership with an
//! opaque `proof` string. Real verification (calling the provider's API,
//! checking a signed attestation) is an external collaborator; the
//! ledger only requires the [`CredentialVerifier`] capability.
//!
//! The default [`MockVerifier`] reproduces the upstream behavior: any
//! proof of at least [`MIN_PROOF_LENGTH`] characters is accepted as-is.
//! Swapping in a real verifier must not change the wrap contract.

use thiserror::Error;

use crate::amount::Amount;
use crate::config::MIN_PROOF_LENGTH;

/// Errors raised during proof verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    /// Proof was missing or malformed before any external check.
    #[error("valid proof of credit ownership required")]
    InvalidProof,

    /// An external verifier rejected the proof.
    #[error("credit verification failed: {0}")]
    Rejected(String),
}

/// Capability for verifying proof of credit ownership.
///
/// Implementations doing external I/O must complete before the ledger
/// takes its per-address lock — `verify` is called outside the critical
/// section for exactly that reason.
pub trait CredentialVerifier: Send + Sync {
    fn verify(
        &self,
        provider_id: &str,
        credit_amount: Amount,
        proof: &str,
    ) -> Result<(), ProofError>;
}

/// Default no-op verifier: accepts any plausible-looking proof.
#[derive(Debug, Default)]
pub struct MockVerifier;

impl CredentialVerifier for MockVerifier {
    fn verify(
        &self,
        _provider_id: &str,
        _credit_amount: Amount,
        proof: &str,
    ) -> Result<(), ProofError> {
        if proof.len() < MIN_PROOF_LENGTH {
            return Err(ProofError::InvalidProof);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_proof() {
        let verifier = MockVerifier;
        assert!(verifier
            .verify("openai", Amount::from_whole(100), "test_proof_12345")
            .is_ok());
    }

    #[test]
    fn rejects_short_proof() {
        let verifier = MockVerifier;
        assert_eq!(
            verifier.verify("openai", Amount::from_whole(100), "short"),
            Err(ProofError::InvalidProof)
        );
    }

    #[test]
    fn rejects_empty_proof() {
        let verifier = MockVerifier;
        assert_eq!(
            verifier.verify("openai", Amount::from_whole(100), ""),
            Err(ProofError::InvalidProof)
        );
    }

    #[test]
    fn boundary_length_is_accepted() {
        let verifier = MockVerifier;
        let proof = "a".repeat(MIN_PROOF_LENGTH);
        assert!(verifier
            .verify("openai", Amount::from_whole(1), &proof)
            .is_ok());
    }
}
