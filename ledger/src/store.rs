//! # LedgerStore — Persistent Record Storage
//!
//! The persistence layer for the VERDANT ledger, built on sled's
//! embedded key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees", each an independent B+ tree
//! with its own keyspace:
//!
//! | Tree           | Key                        | Value                        |
//! |----------------|----------------------------|------------------------------|
//! | `wraps`        | `address (42B) ++ seq (8B BE)` | `bincode(WrappedCreditRecord)` |
//! | `retirements`  | `address (42B) ++ seq (8B BE)` | `bincode(RetirementRecord)`  |
//! | `certificates` | `certificate_id` (UTF-8)   | `bincode(RetirementRecord)`  |
//! | `balances`     | `address` (UTF-8)          | `micro-units` (8B BE)        |
//!
//! Addresses are a fixed 42 bytes (validated upstream), so prefix scans
//! by address are unambiguous. Sequence numbers are big-endian so sled's
//! lexicographic ordering matches insertion order — per-address record
//! listings come back oldest-first for free.
//!
//! ## Atomicity
//!
//! A wrap or retirement writes the record, any index entry, and the
//! updated balance through one multi-tree sled transaction. Either
//! everything lands on disk or nothing does — no partial writes, even
//! if a later tree write fails or the process dies mid-call.
//!
//! Sequence counters are recovered by scanning tree keys at open rather
//! than persisted separately, so a crash can never resurrect a stale
//! counter and overwrite an existing record.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};

use crate::amount::Amount;
use crate::ledger::WrappedCreditRecord;
use crate::retire::RetirementRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Codec(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))
}

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

/// Persistent append-only storage for wrap and retirement records plus
/// the derived per-address balance.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes,
/// so a `LedgerStore` can be shared via `Arc` without external locking.
/// The *check-and-mutate* sequence around balances still needs the
/// per-address lock held by [`crate::BalanceLedger`] — the store itself
/// only guarantees that each individual write is atomic.
#[derive(Debug)]
pub struct LedgerStore {
    /// The underlying sled database handle.
    db: Db,
    /// Wrap records, keyed by address + sequence.
    wraps: Tree,
    /// Retirement records, keyed by address + sequence.
    retirements: Tree,
    /// Certificate index: certificate id -> retirement record.
    certificates: Tree,
    /// Derived balances: address -> micro-units (8B BE).
    balances: Tree,
    /// Next wrap sequence number (process-global, monotonic).
    wrap_seq: AtomicU64,
    /// Next retirement sequence number.
    retirement_seq: AtomicU64,
}

impl LedgerStore {
    /// Opens or creates a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates a temporary store that lives in memory and is cleaned up
    /// when dropped. Ideal for tests — no filesystem side effects.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let wraps = db.open_tree("wraps")?;
        let retirements = db.open_tree("retirements")?;
        let certificates = db.open_tree("certificates")?;
        let balances = db.open_tree("balances")?;

        let wrap_seq = AtomicU64::new(recover_next_seq(&wraps)?);
        let retirement_seq = AtomicU64::new(recover_next_seq(&retirements)?);

        Ok(Self {
            db,
            wraps,
            retirements,
            certificates,
            balances,
            wrap_seq,
            retirement_seq,
        })
    }

    // -- Balance operations -------------------------------------------------

    /// Derived balance for an address. Zero for addresses never seen.
    pub fn balance(&self, address: &str) -> StoreResult<Amount> {
        match self.balances.get(address.as_bytes())? {
            Some(bytes) => Ok(Amount::from_micros(be_u64(&bytes))),
            None => Ok(Amount::ZERO),
        }
    }

    // -- Wrap operations ----------------------------------------------------

    /// Appends a wrap record and sets the address balance in one
    /// multi-tree transaction.
    ///
    /// The caller must hold the per-address lock and have computed
    /// `new_balance` from the current balance under that lock.
    pub fn append_wrap(
        &self,
        record: &WrappedCreditRecord,
        new_balance: Amount,
    ) -> StoreResult<()> {
        let seq = self.wrap_seq.fetch_add(1, Ordering::SeqCst);
        let key = record_key(&record.user_address, seq);
        let bytes = encode(record)?;

        (&self.wraps, &self.balances)
            .transaction(
                |(wraps, balances)| -> ConflictableTransactionResult<(), sled::Error> {
                    wraps.insert(key.as_slice(), bytes.as_slice())?;
                    balances.insert(
                        record.user_address.as_bytes(),
                        &new_balance.micros().to_be_bytes(),
                    )?;
                    Ok(())
                },
            )
            .map_err(flatten_tx_error)?;
        Ok(())
    }

    /// All wrap records for an address, oldest first.
    pub fn wraps_for(&self, address: &str) -> StoreResult<Vec<WrappedCreditRecord>> {
        scan_address(&self.wraps, address)
    }

    // -- Retirement operations ----------------------------------------------

    /// Appends a retirement record, indexes its certificate, and sets
    /// the address balance in one multi-tree transaction. Returns the
    /// sequence number assigned to the record (its `id`).
    ///
    /// The caller must hold the per-address lock. The transaction spans
    /// all three trees: a failure in any write rolls back the others, so
    /// a retirement can never persist without its balance debit.
    pub fn append_retirement(
        &self,
        record: &RetirementRecord,
        new_balance: Amount,
    ) -> StoreResult<u64> {
        let seq = self.retirement_seq.fetch_add(1, Ordering::SeqCst);
        let mut stored = record.clone();
        stored.id = seq;

        let bytes = encode(&stored)?;
        let key = record_key(&stored.user_address, seq);

        (&self.retirements, &self.certificates, &self.balances)
            .transaction(
                |(retirements, certificates, balances)| -> ConflictableTransactionResult<
                    (),
                    sled::Error,
                > {
                    retirements.insert(key.as_slice(), bytes.as_slice())?;
                    certificates.insert(stored.certificate_id.as_bytes(), bytes.as_slice())?;
                    balances.insert(
                        stored.user_address.as_bytes(),
                        &new_balance.micros().to_be_bytes(),
                    )?;
                    Ok(())
                },
            )
            .map_err(flatten_tx_error)?;
        Ok(seq)
    }

    /// All retirement records for an address, oldest first.
    pub fn retirements_for(&self, address: &str) -> StoreResult<Vec<RetirementRecord>> {
        scan_address(&self.retirements, address)
    }

    /// Every retirement record in the store. Used by the stats endpoint;
    /// a full scan is fine at the documented scale.
    pub fn all_retirements(&self) -> StoreResult<Vec<RetirementRecord>> {
        self.retirements
            .iter()
            .map(|entry| {
                let (_, value) = entry?;
                decode(&value)
            })
            .collect()
    }

    /// Looks up a retirement record by certificate id.
    pub fn retirement_by_certificate(
        &self,
        certificate_id: &str,
    ) -> StoreResult<Option<RetirementRecord>> {
        match self.certificates.get(certificate_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Total number of retirement records across all addresses.
    pub fn retirement_count(&self) -> usize {
        self.retirements.len()
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Flushes all pending writes to disk. Called once at shutdown;
    /// sled also flushes periodically on its own.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Collapses a transaction failure into a plain storage error. The
/// closures never abort, so both arms carry a `sled::Error`.
fn flatten_tx_error(err: TransactionError<sled::Error>) -> StoreError {
    match err {
        TransactionError::Abort(e) | TransactionError::Storage(e) => StoreError::Sled(e),
    }
}

/// Prefix-scans a tree for one address's records. Reads accept arbitrary
/// strings, so entries whose key is longer than `address ++ seq` are
/// skipped — a truncated query must not pick up another address's rows.
fn scan_address<T: serde::de::DeserializeOwned>(tree: &Tree, address: &str) -> StoreResult<Vec<T>> {
    let expected_len = address.len() + 8;
    let mut records = Vec::new();
    for entry in tree.scan_prefix(address.as_bytes()) {
        let (key, value) = entry?;
        if key.len() == expected_len {
            records.push(decode(&value)?);
        }
    }
    Ok(records)
}

/// Composes a record key: fixed-width address bytes followed by a
/// big-endian sequence number.
fn record_key(address: &str, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(address.len() + 8);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// Recovers the next sequence number by scanning existing keys. The seq
/// is the trailing 8 bytes of every key.
fn recover_next_seq(tree: &Tree) -> StoreResult<u64> {
    let mut next = 0u64;
    for entry in tree.iter().keys() {
        let key = entry?;
        if key.len() >= 8 {
            let seq = be_u64(&key[key.len() - 8..]);
            next = next.max(seq + 1);
        }
    }
    Ok(next)
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn wrap_record(address: &str, tokens: u64, tx: &str) -> WrappedCreditRecord {
        WrappedCreditRecord {
            user_address: address.to_string(),
            provider: "openai".to_string(),
            credit_amount: Amount::from_whole(tokens),
            tokens_issued: Amount::from_whole(tokens),
            proof: "test_proof_12345".to_string(),
            transaction_hash: tx.to_string(),
            created_at: Utc::now(),
        }
    }

    fn retirement_record(address: &str, tokens: u64, cert: &str) -> RetirementRecord {
        let retired = Amount::from_whole(tokens);
        RetirementRecord {
            id: 0,
            user_address: address.to_string(),
            tokens_retired: retired,
            carbon_credits_purchased: retired.to_carbon_tons(),
            offset_provider: "GreenCarbon Solutions".to_string(),
            certificate_id: cert.to_string(),
            transaction_hash: format!("0x{:040x}", tokens),
            reason: "Carbon offset retirement".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_address_has_zero_balance() {
        let store = LedgerStore::open_temporary().unwrap();
        assert_eq!(store.balance(ALICE).unwrap(), Amount::ZERO);
        assert!(store.wraps_for(ALICE).unwrap().is_empty());
        assert!(store.retirements_for(ALICE).unwrap().is_empty());
    }

    #[test]
    fn append_wrap_persists_record_and_balance() {
        let store = LedgerStore::open_temporary().unwrap();
        let record = wrap_record(ALICE, 100, "0xaaa1");
        store.append_wrap(&record, Amount::from_whole(100)).unwrap();

        assert_eq!(store.balance(ALICE).unwrap(), Amount::from_whole(100));
        let wraps = store.wraps_for(ALICE).unwrap();
        assert_eq!(wraps.len(), 1);
        assert_eq!(wraps[0].transaction_hash, "0xaaa1");
        assert_eq!(wraps[0].tokens_issued, Amount::from_whole(100));
    }

    #[test]
    fn wraps_come_back_in_insertion_order() {
        let store = LedgerStore::open_temporary().unwrap();
        for i in 1..=5u64 {
            let record = wrap_record(ALICE, i, &format!("0xtx{}", i));
            store.append_wrap(&record, Amount::from_whole(i)).unwrap();
        }
        let wraps = store.wraps_for(ALICE).unwrap();
        let txs: Vec<&str> = wraps.iter().map(|w| w.transaction_hash.as_str()).collect();
        assert_eq!(txs, vec!["0xtx1", "0xtx2", "0xtx3", "0xtx4", "0xtx5"]);
    }

    #[test]
    fn addresses_are_isolated() {
        let store = LedgerStore::open_temporary().unwrap();
        store
            .append_wrap(&wrap_record(ALICE, 100, "0xa"), Amount::from_whole(100))
            .unwrap();
        store
            .append_wrap(&wrap_record(BOB, 50, "0xb"), Amount::from_whole(50))
            .unwrap();

        assert_eq!(store.wraps_for(ALICE).unwrap().len(), 1);
        assert_eq!(store.wraps_for(BOB).unwrap().len(), 1);
        assert_eq!(store.balance(ALICE).unwrap(), Amount::from_whole(100));
        assert_eq!(store.balance(BOB).unwrap(), Amount::from_whole(50));
    }

    #[test]
    fn append_retirement_assigns_sequential_ids() {
        let store = LedgerStore::open_temporary().unwrap();
        let id0 = store
            .append_retirement(&retirement_record(ALICE, 10, "GCS-1"), Amount::from_whole(90))
            .unwrap();
        let id1 = store
            .append_retirement(&retirement_record(ALICE, 20, "GCS-2"), Amount::from_whole(70))
            .unwrap();

        assert_eq!(id0, 0);
        assert_eq!(id1, 1);

        let history = store.retirements_for(ALICE).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, 0);
        assert_eq!(history[1].id, 1);
    }

    #[test]
    fn certificate_lookup_finds_record() {
        let store = LedgerStore::open_temporary().unwrap();
        store
            .append_retirement(
                &retirement_record(ALICE, 10, "GCS-20260828-abcd1234"),
                Amount::from_whole(0),
            )
            .unwrap();

        let found = store
            .retirement_by_certificate("GCS-20260828-abcd1234")
            .unwrap()
            .expect("certificate should exist");
        assert_eq!(found.user_address, ALICE);
        assert!(store
            .retirement_by_certificate("GCS-00000000-ffffffff")
            .unwrap()
            .is_none());
    }

    #[test]
    fn sequence_counters_survive_reopen() {
        let dir = std::env::temp_dir().join(format!("verdant-store-{}", uuid::Uuid::new_v4()));
        {
            let store = LedgerStore::open(&dir).unwrap();
            store
                .append_wrap(&wrap_record(ALICE, 100, "0x1"), Amount::from_whole(100))
                .unwrap();
            store
                .append_retirement(&retirement_record(ALICE, 10, "GCS-x"), Amount::from_whole(90))
                .unwrap();
            store.flush().unwrap();
        }

        let store = LedgerStore::open(&dir).unwrap();
        // A fresh append must not collide with the existing records.
        store
            .append_wrap(&wrap_record(ALICE, 5, "0x2"), Amount::from_whole(95))
            .unwrap();
        let id = store
            .append_retirement(&retirement_record(ALICE, 5, "GCS-y"), Amount::from_whole(90))
            .unwrap();

        assert_eq!(store.wraps_for(ALICE).unwrap().len(), 2);
        assert_eq!(id, 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn retirement_write_lands_in_all_three_trees_together() {
        let store = LedgerStore::open_temporary().unwrap();
        let record = retirement_record(ALICE, 40, "GCS-20260828-0a0b0c0d");
        store
            .append_retirement(&record, Amount::from_whole(60))
            .unwrap();

        // One call, one transaction: record, certificate index, and
        // balance must all reflect the write.
        let history = store.retirements_for(ALICE).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tokens_retired, Amount::from_whole(40));
        assert!(store
            .retirement_by_certificate("GCS-20260828-0a0b0c0d")
            .unwrap()
            .is_some());
        assert_eq!(store.balance(ALICE).unwrap(), Amount::from_whole(60));
    }

    #[test]
    fn all_retirements_spans_addresses() {
        let store = LedgerStore::open_temporary().unwrap();
        store
            .append_retirement(&retirement_record(ALICE, 10, "GCS-1"), Amount::ZERO)
            .unwrap();
        store
            .append_retirement(&retirement_record(BOB, 20, "GCS-2"), Amount::ZERO)
            .unwrap();

        assert_eq!(store.all_retirements().unwrap().len(), 2);
        assert_eq!(store.retirement_count(), 2);
    }
}
