//! End-to-end ledger flows, exercised through the public crate API the
//! same way the HTTP layer drives it.

use std::sync::Arc;

use verdant_ledger::{
    Amount, BalanceLedger, LedgerError, LedgerStore, MockChainIssuer, MockVerifier,
    ProviderRegistry, RetirementEngine,
};

const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const PROOF: &str = "test_proof_12345";
const REASON: &str = "Carbon offset retirement";

fn build() -> (Arc<BalanceLedger>, RetirementEngine) {
    let issuer = Arc::new(MockChainIssuer::new());
    let ledger = Arc::new(BalanceLedger::new(
        Arc::new(LedgerStore::open_temporary().unwrap()),
        Arc::new(ProviderRegistry::with_defaults()),
        Arc::new(MockVerifier),
        issuer.clone(),
    ));
    let engine = RetirementEngine::new(ledger.clone(), issuer);
    (ledger, engine)
}

#[test]
fn documented_wrap_and_retire_flow() {
    let (ledger, engine) = build();

    // Wrap 100 OpenAI credits.
    let wrap = ledger.wrap(ALICE, "openai", 100.0, PROOF).unwrap();
    assert_eq!(wrap.tokens_issued, Amount::from_whole(100));
    assert!(wrap.transaction_hash.starts_with("0x"));

    // Balance reflects the wrap.
    let summary = ledger.get_balance(ALICE).unwrap();
    assert_eq!(summary.total_balance.to_decimal(), 100.0);
    assert_eq!(summary.wrapped_credits.len(), 1);

    // Retire half.
    let retirement = engine.retire(ALICE, 50.0, REASON).unwrap();
    assert_eq!(retirement.tokens_retired.to_decimal(), 50.0);
    assert_eq!(retirement.carbon_credits_purchased.to_decimal(), 0.05);
    assert_eq!(retirement.offset_provider, "GreenCarbon Solutions");
    assert!(retirement.certificate_id.starts_with("GCS-"));

    // Balance reflects the burn; history has one entry.
    assert_eq!(
        ledger.get_balance(ALICE).unwrap().total_balance.to_decimal(),
        50.0
    );
    let history = engine.get_history(ALICE).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].certificate_id, retirement.certificate_id);

    // Stats see the retirement.
    let stats = engine.stats().unwrap();
    assert_eq!(stats.total_offsets, 1);
    assert_eq!(stats.total_carbon_credits_purchased.to_decimal(), 0.05);
    assert_eq!(stats.environmental_impact.equivalent_trees_planted, 2);
}

#[test]
fn fresh_address_reads_are_idempotent() {
    let (ledger, engine) = build();
    for _ in 0..3 {
        let summary = ledger.get_balance(BOB).unwrap();
        assert!(summary.total_balance.is_zero());
        assert!(summary.wrapped_credits.is_empty());
        assert!(engine.get_history(BOB).unwrap().is_empty());
    }
}

#[test]
fn failed_retirement_leaves_everything_unchanged() {
    let (ledger, engine) = build();
    ledger.wrap(ALICE, "anthropic", 10.0, PROOF).unwrap();

    match engine.retire(ALICE, 1_000.0, REASON) {
        Err(LedgerError::InsufficientBalance {
            available,
            requested,
        }) => {
            assert_eq!(available, Amount::from_whole(10));
            assert_eq!(requested, Amount::from_whole(1_000));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other.map(|r| r.id)),
    }

    assert_eq!(
        ledger.get_balance(ALICE).unwrap().total_balance,
        Amount::from_whole(10)
    );
    assert!(engine.get_history(ALICE).unwrap().is_empty());
    assert_eq!(engine.stats().unwrap().total_offsets, 0);
}

#[test]
fn wrap_transaction_ids_are_unique_at_volume() {
    let (ledger, _engine) = build();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10_000 {
        let record = ledger.wrap(ALICE, "openai", 1.0, PROOF).unwrap();
        assert!(seen.insert(record.transaction_hash));
    }
    assert_eq!(
        ledger.get_balance(ALICE).unwrap().total_balance,
        Amount::from_whole(10_000)
    );
}

#[test]
fn concurrent_retirements_never_overdraw() {
    let (ledger, engine) = build();
    let engine = Arc::new(engine);
    ledger.wrap(ALICE, "openai", 100.0, PROOF).unwrap();

    // 8 threads race to retire 25 tokens each; only 4 can succeed.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(std::thread::spawn(move || {
            engine.retire(ALICE, 25.0, REASON).is_ok()
        }));
    }
    let successes = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|succeeded| *succeeded)
        .count();

    assert_eq!(successes, 4);
    assert!(ledger.get_balance(ALICE).unwrap().total_balance.is_zero());
    assert_eq!(engine.get_history(ALICE).unwrap().len(), 4);
}
