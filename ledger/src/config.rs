//! # Platform Configuration & Constants
//!
//! Every magic number in VERDANT lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! The offset rate in particular is a documented platform commitment:
//! change it and every certificate issued afterwards means something
//! different, so don't.

// ---------------------------------------------------------------------------
// Platform Identity
// ---------------------------------------------------------------------------

/// Human-readable service name, used in API metadata and log banners.
pub const SERVICE_NAME: &str = "VERDANT Exchange";

/// Ticker symbol of the platform's internal token unit.
pub const TOKEN_SYMBOL: &str = "VRD";

// ---------------------------------------------------------------------------
// Amount Representation
// ---------------------------------------------------------------------------

/// Number of decimal places carried by [`crate::Amount`].
///
/// Six decimals covers every documented conversion exactly (the offset
/// rate divides micro-units by 1000 with no remainder for any amount
/// with three or fewer decimal places).
pub const AMOUNT_DECIMALS: u32 = 6;

/// Scale factor between whole tokens and micro-units. Keep in sync with
/// `AMOUNT_DECIMALS` or the arithmetic tests will let you know.
pub const AMOUNT_SCALE: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Carbon Offset Parameters
// ---------------------------------------------------------------------------

/// Tons of CO2e offset per retired token. The documented platform rate:
/// 1 token = 0.001 tons.
pub const OFFSET_RATE_TONS_PER_TOKEN: f64 = 0.001;

/// The offset rate expressed as an exact divisor on micro-units.
/// `carbon_micro_tons = token_micro_units / OFFSET_RATE_DIVISOR`.
pub const OFFSET_RATE_DIVISOR: u64 = 1_000;

/// The simulated offset provider recorded on every retirement.
pub const OFFSET_PROVIDER: &str = "GreenCarbon Solutions";

/// Short code prefixing every certificate id, e.g. `GCS-20260828-1a2b3c4d`.
pub const CERTIFICATE_PREFIX: &str = "GCS";

/// Rough equivalence used in the stats endpoint: trees planted per ton
/// of CO2e offset.
pub const TREES_PER_TON: f64 = 40.0;

/// Rough equivalence used in the stats endpoint: average yearly car
/// emissions in tons of CO2e.
pub const CAR_EMISSIONS_TONS_PER_YEAR: f64 = 4.6;

// ---------------------------------------------------------------------------
// Validation Limits
// ---------------------------------------------------------------------------

/// Total length of an Ethereum-style address: `0x` + 40 hex characters.
pub const ADDRESS_LENGTH: usize = 42;

/// Minimum accepted length of a proof-of-ownership string. The mock
/// verifier rejects anything shorter; real verifiers may be stricter.
pub const MIN_PROOF_LENGTH: usize = 10;

// ---------------------------------------------------------------------------
// Network Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 8000;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 8001;
