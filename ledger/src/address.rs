//! # Address Validation
//!
//! User addresses are Ethereum-style: `0x` followed by 40 hex characters,
//! 42 characters total. The ledger validates format only — it makes no
//! claim that anyone holds the corresponding key. Checksums (EIP-55
//! casing) are deliberately not enforced; the upstream service accepts
//! either casing.

use thiserror::Error;

use crate::config::ADDRESS_LENGTH;

/// Errors raised when validating a user address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// Missing the `0x` prefix.
    #[error("address must start with 0x: {0:?}")]
    MissingPrefix(String),

    /// Wrong total length (expected 42 characters).
    #[error("address must be {expected} characters, got {actual}: {address:?}")]
    BadLength {
        address: String,
        expected: usize,
        actual: usize,
    },

    /// Contains a non-hex character after the prefix.
    #[error("address contains non-hex characters: {0:?}")]
    NotHex(String),
}

/// Validates an Ethereum-style address. Returns the address unchanged on
/// success so call sites can validate-and-bind in one expression.
pub fn validate(address: &str) -> Result<&str, AddressError> {
    if !address.starts_with("0x") {
        return Err(AddressError::MissingPrefix(address.to_string()));
    }
    if address.len() != ADDRESS_LENGTH {
        return Err(AddressError::BadLength {
            address: address.to_string(),
            expected: ADDRESS_LENGTH,
            actual: address.len(),
        });
    }
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex(address.to_string()));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "0x1234567890123456789012345678901234567890";

    #[test]
    fn accepts_well_formed_address() {
        assert_eq!(validate(GOOD), Ok(GOOD));
    }

    #[test]
    fn accepts_mixed_case_hex() {
        assert!(validate("0xAbCdEf1234567890123456789012345678901234").is_ok());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            validate("1234567890123456789012345678901234567890ab"),
            Err(AddressError::MissingPrefix(_))
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            validate("0x1234"),
            Err(AddressError::BadLength { actual: 6, .. })
        ));
        assert!(matches!(
            validate("0x12345678901234567890123456789012345678901"),
            Err(AddressError::BadLength { .. })
        ));
    }

    #[test]
    fn rejects_non_hex_characters() {
        assert!(matches!(
            validate("0x123456789012345678901234567890123456789z"),
            Err(AddressError::NotHex(_))
        ));
    }

    #[test]
    fn rejects_empty_string() {
        assert!(validate("").is_err());
    }
}
