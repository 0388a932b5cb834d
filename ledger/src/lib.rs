// Copyright (c) 2026 Verdant Labs. MIT License.
// See LICENSE for details.

//! # VERDANT Ledger — Core Library
//!
//! The accounting core of VERDANT: wrap AI-service credits into platform
//! tokens, retire tokens against carbon offsets, and keep an append-only
//! record of every event in between. Nothing in here is ever updated in
//! place — the ledger only grows, which is exactly how audit trails
//! should behave.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! retirement ledger:
//!
//! - **amount** — Fixed-point token amounts. No floating point in the books.
//! - **address** — Ethereum-style address validation at the boundary.
//! - **registry** — Supported AI-credit providers and conversion rates.
//! - **issuer** — Transaction hash and certificate id generation.
//! - **verifier** — Pluggable proof-of-credit-ownership verification.
//! - **store** — Persistent append-only record storage over sled.
//! - **ledger** — The balance ledger: wrap, read, debit.
//! - **retire** — The retirement engine: burn tokens, record offsets.
//! - **config** — Constants and platform parameters.
//!
//! ## Design Philosophy
//!
//! 1. All amounts are fixed-point `u64` micro-units. Decimals exist only
//!    at the JSON boundary.
//! 2. Validation happens before any mutation. A rejected request leaves
//!    the ledger byte-for-byte unchanged.
//! 3. Records are append-only and immutable. Balances are derived state.
//! 4. If it touches a balance, it holds the per-address lock first.

pub mod address;
pub mod amount;
pub mod config;
pub mod issuer;
pub mod ledger;
pub mod registry;
pub mod retire;
pub mod store;
pub mod verifier;

pub use amount::{Amount, AmountError};
pub use issuer::{MockChainIssuer, TransactionIssuer};
pub use ledger::{BalanceLedger, BalanceSummary, LedgerError, WrappedCreditRecord};
pub use registry::{Provider, ProviderRegistry, RegistryError};
pub use retire::{CarbonStats, EnvironmentalImpact, RetirementEngine, RetirementRecord};
pub use store::{LedgerStore, StoreError};
pub use verifier::{CredentialVerifier, MockVerifier, ProofError};
