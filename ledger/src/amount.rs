//! # Fixed-Point Token Amounts
//!
//! Every token, credit, and carbon quantity in VERDANT is an [`Amount`]:
//! a `u64` count of micro-units (six decimal places). Arithmetic happens
//! on integers only — floating point exists at the JSON boundary and
//! nowhere else, because "approximately 0.05 tons of CO2" is not
//! something you print on a certificate.
//!
//! The serde implementation is format-aware: human-readable formats
//! (JSON) see a plain decimal number, binary formats (bincode, used by
//! the store) see the raw `u64`. Round-tripping through the store is
//! therefore exact.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{AMOUNT_SCALE, OFFSET_RATE_DIVISOR};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised when parsing or combining amounts.
#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    /// Input was NaN or infinite.
    #[error("amount must be a finite number")]
    NotFinite,

    /// Input was zero or negative. Ledger amounts are strictly positive.
    #[error("amount must be greater than 0")]
    NotPositive,

    /// Input exceeds the representable range (~18.4 trillion whole tokens).
    /// If you're hitting this, someone is wrapping more AI credits than
    /// exist on the planet.
    #[error("amount {0} exceeds the representable range")]
    TooLarge(f64),

    /// Integer overflow while combining two amounts.
    #[error("amount arithmetic overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A non-negative fixed-point quantity in micro-units (10^-6 tokens).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    /// Zero. The balance every fresh address starts with.
    pub const ZERO: Amount = Amount(0);

    /// Constructs an amount from raw micro-units. No validation — the
    /// input is already in ledger representation.
    pub const fn from_micros(micros: u64) -> Self {
        Amount(micros)
    }

    /// Constructs an amount from whole tokens.
    pub const fn from_whole(tokens: u64) -> Self {
        Amount(tokens * AMOUNT_SCALE)
    }

    /// Parses a caller-supplied decimal value.
    ///
    /// Rejects NaN, infinities, non-positive values, values beyond the
    /// representable range, and positive values too small to register a
    /// single micro-unit. Sub-micro precision is rounded to the nearest
    /// micro-unit (rounding policy is unspecified upstream; nearest is
    /// the least surprising choice).
    pub fn from_decimal(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite);
        }
        if value <= 0.0 {
            return Err(AmountError::NotPositive);
        }
        let scaled = value * AMOUNT_SCALE as f64;
        if scaled >= u64::MAX as f64 {
            return Err(AmountError::TooLarge(value));
        }
        let micros = scaled.round() as u64;
        if micros == 0 {
            // Positive but below one micro-unit. Crediting nothing would
            // still mint a ledger record, so reject instead.
            return Err(AmountError::NotPositive);
        }
        Ok(Amount(micros))
    }

    /// Raw micro-unit count.
    pub const fn micros(&self) -> u64 {
        self.0
    }

    /// Decimal representation for the JSON boundary. Lossy for amounts
    /// above 2^53 micro-units; exact for every documented scenario.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / AMOUNT_SCALE as f64
    }

    /// Returns `true` if this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Checked subtraction. `None` means "insufficient" — the caller
    /// turns that into its own error with context.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiplies by a conversion rate, itself expressed as an [`Amount`]
    /// of tokens-per-credit. Exact integer arithmetic via u128.
    pub fn convert(self, rate: Amount) -> Result<Amount, AmountError> {
        let product = self.0 as u128 * rate.0 as u128 / AMOUNT_SCALE as u128;
        u64::try_from(product)
            .map(Amount)
            .map_err(|_| AmountError::Overflow)
    }

    /// Applies the fixed carbon offset rate: tokens to tons of CO2e.
    ///
    /// Exact for any amount with three or fewer decimal places; amounts
    /// finer than that truncate toward zero at the micro-ton.
    pub fn to_carbon_tons(self) -> Amount {
        Amount(self.0 / OFFSET_RATE_DIVISOR)
    }
}

impl fmt::Display for Amount {
    /// Renders as a plain decimal with at least one fractional digit:
    /// `100.0`, `0.05`, `12.345678`. Whole amounts keep the `.0` so the
    /// strings in receipts and messages match the v1 service exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / AMOUNT_SCALE;
        let frac = self.0 % AMOUNT_SCALE;
        if frac == 0 {
            return write!(f, "{}.0", whole);
        }
        let frac_str = format!("{:06}", frac);
        write!(f, "{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_f64(self.to_decimal())
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        if deserializer.is_human_readable() {
            let value = f64::deserialize(deserializer)?;
            if !value.is_finite() || value < 0.0 {
                return Err(D::Error::custom("amount must be a non-negative number"));
            }
            let scaled = value * AMOUNT_SCALE as f64;
            if scaled >= u64::MAX as f64 {
                return Err(D::Error::custom("amount out of range"));
            }
            Ok(Amount(scaled.round() as u64))
        } else {
            Ok(Amount(u64::deserialize(deserializer)?))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
