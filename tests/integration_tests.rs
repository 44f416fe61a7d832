//! Integration tests for transaction and block validation

mod common;

use common::*;
use ledger_objs::*;

#[test]
fn test_deposit_spend_admitted() -> anyhow::Result<()> {
    let alice = signer(1);
    let consumed = vec![deposit(&alice, 100, 1)];
    let tx = build_tx(&consumed, vec![value_store(&alice, 90)], 10, &alice)?;

    let validator = LedgerValidator::new(CHAIN_ID)?;
    validator.pre_validate_pending(&tx)?;
    validator.post_validate_pending(&tx, 1, &consumed, &fees(10))?;
    Ok(())
}

#[test]
fn test_balance_law() -> anyhow::Result<()> {
    let alice = signer(1);
    let bob = signer(2);
    let consumed = vec![deposit(&alice, 100, 1), deposit(&alice, 25, 2)];
    let tx = build_tx(
        &consumed,
        vec![value_store(&bob, 60), value_store(&alice, 55)],
        10,
        &alice,
    )?;
    tx.validate_equal_vin_vout(1, &consumed)?;

    let short = build_tx(&consumed, vec![value_store(&bob, 60)], 10, &alice)?;
    let err = short.validate_equal_vin_vout(1, &consumed).unwrap_err();
    assert!(matches!(err, LedgerError::Economic(_)));
    Ok(())
}

#[test]
fn test_block_with_two_txs() -> anyhow::Result<()> {
    let alice = signer(1);
    let bob = signer(2);
    let consumed = vec![deposit(&alice, 100, 1), deposit(&bob, 40, 2)];
    let txs = TxVec::from(vec![
        build_tx(&consumed[..1], vec![value_store(&bob, 95)], 5, &alice)?,
        build_tx(&consumed[1..], vec![value_store(&alice, 35)], 5, &bob)?,
    ]);

    let validator = LedgerValidator::new(CHAIN_ID)?;
    validator.validate_block_txs(&txs, 1, &consumed, &fees(5))?;
    assert_eq!(txs.consumed_utxo_id().len(), 2);
    assert_eq!(txs.generated_utxo_id()?.len(), 2);
    assert_eq!(txs.consumed_is_deposit(), vec![true, true]);
    Ok(())
}

#[test]
fn test_double_spend_across_block_is_structural() -> anyhow::Result<()> {
    let alice = signer(1);
    let consumed = vec![deposit(&alice, 100, 1)];
    let txs = TxVec::from(vec![
        build_tx(&consumed, vec![value_store(&alice, 95)], 5, &alice)?,
        build_tx(&consumed, vec![value_store(&alice, 90)], 10, &alice)?,
    ]);

    let validator = LedgerValidator::new(CHAIN_ID)?;
    let err = validator
        .validate_block_txs(&txs, 1, &consumed, &fees(5))
        .unwrap_err();
    assert!(err.is_structural());
    Ok(())
}

#[test]
fn test_tx_hash_determinism() -> anyhow::Result<()> {
    let alice = signer(1);
    let consumed = vec![deposit(&alice, 100, 1)];
    let a = build_tx(&consumed, vec![value_store(&alice, 90)], 10, &alice)?;
    let b = build_tx(&consumed, vec![value_store(&alice, 90)], 10, &alice)?;
    let c = build_tx(&consumed, vec![value_store(&alice, 89)], 11, &alice)?;
    assert_eq!(a.tx_hash()?, b.tx_hash()?);
    assert_ne!(a.tx_hash()?, c.tx_hash()?);

    let decoded = Tx::unmarshal_binary(&a.marshal_binary()?)?;
    assert_eq!(decoded.tx_hash()?, a.tx_hash()?);
    decoded.validate_tx_hash()?;
    Ok(())
}

#[test]
fn test_datastore_lifecycle_and_cleanup() -> anyhow::Result<()> {
    let alice = signer(1);
    let stranger = signer(9);

    // create a 1-byte DataStore paying for three epochs
    let funding = vec![deposit(&alice, 1895, 1)];
    let ds = data_store(&alice, 4, 1, vec![0xaa], 3);
    let create = build_tx(&funding, vec![ds.into()], 10, &alice)?;
    let mut set = ExclusionSet::new();
    create.validate(&mut set, 1, &funding, &fees(10))?;
    LedgerValidator::new(CHAIN_ID)?.validate_for_mining(&create, 1)?;

    // once expired anyone may collect the remaining collateral
    let created = vec![create.vout()[0].clone()];
    let height = 5 * EPOCH_LENGTH;
    let cleanup = build_tx(&created, vec![value_store(&stranger, 377)], 0, &stranger)?;
    assert!(cleanup.is_cleanup_tx(height, &created));
    cleanup.pre_validate_pending(CHAIN_ID)?;
    cleanup.post_validate_pending(height, &created, &fees(10))?;

    // before expiration only the owner may consume it
    let early = 3 * EPOCH_LENGTH;
    let err = cleanup.validate_signature(early, &created).unwrap_err();
    assert!(matches!(err, LedgerError::Authorization(_)));
    Ok(())
}

#[test]
fn test_duplicate_datastore_index_in_block() -> anyhow::Result<()> {
    let alice = signer(1);
    let funding = vec![deposit(&alice, 1885, 1), deposit(&alice, 1885, 2)];
    let txs = TxVec::from(vec![
        build_tx(&funding[..1], vec![data_store(&alice, 4, 1, vec![1], 3).into()], 0, &alice)?,
        build_tx(&funding[1..], vec![data_store(&alice, 4, 1, vec![2], 3).into()], 0, &alice)?,
    ]);
    let mut set = ExclusionSet::new();
    let err = txs.validate_data_store_indexes(&mut set).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    Ok(())
}
