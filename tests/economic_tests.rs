//! DataStore decay and AtomicSwap expiry scenarios

mod common;

use common::*;
use ledger_objs::economic::*;
use ledger_objs::*;

#[test]
fn test_datastore_decay_schedule() -> anyhow::Result<()> {
    let alice = signer(1);
    let ds = data_store(&alice, 1, 1, vec![0x01], 3);
    assert_eq!(ds.deposit(), Uint256::from(1885u32));
    assert_eq!(ds.epoch_of_expiration()?, 5);

    let expected = [
        (1, 1885u32),
        (2 * EPOCH_LENGTH, 1508),
        (3 * EPOCH_LENGTH, 1131),
        (4 * EPOCH_LENGTH, 754),
        (5 * EPOCH_LENGTH, 377),
        (50 * EPOCH_LENGTH, 377),
    ];
    for (height, value) in expected {
        assert_eq!(ds.remaining_value(height)?, Uint256::from(value), "height {}", height);
    }

    assert!(!ds.is_expired(4 * EPOCH_LENGTH)?);
    assert!(ds.is_expired(4 * EPOCH_LENGTH + 1)?);
    Ok(())
}

#[test]
fn test_deposit_equations_agree() -> anyhow::Result<()> {
    for data_size in [1u32, 32, 1000, MAX_DATASTORE_SIZE] {
        for num_epochs in [1u32, 2, 10, 1000] {
            let deposit = base_deposit_equation(data_size, num_epochs)?;
            assert_eq!(num_epochs_equation(data_size, &deposit)?, num_epochs);
        }
    }
    assert!(base_deposit_equation(MAX_DATASTORE_SIZE + 1, 1).is_err());
    Ok(())
}

#[test]
fn test_reward_rejects_backwards_epochs() {
    let deposit = Uint256::from(1885u32);
    assert!(reward_deposit_equation(&deposit, 1, 3, 2).is_err());
}

#[test]
fn test_datastore_fee_schedule() -> anyhow::Result<()> {
    let alice = signer(1);
    let ds = data_store(&alice, 1, 1, vec![0x01], 3);
    let schedule = FeeSchedule {
        data_store_epoch_fee: Uint256::from(2u32),
        ..FeeSchedule::default()
    };
    // 2 per epoch over numEpochs + 2 epochs
    assert!(ds.validate_fee(&schedule).is_err());
    assert_eq!(data_store_fee_equation(&Uint256::from(2u32), 3)?, Uint256::from(10u32));
    Ok(())
}

fn swap_fixture() -> (AtomicSwap, Secp256k1Signer, Secp256k1Signer, Hash) {
    let alice = signer(1);
    let bob = signer(2);
    let hash_key = [42u8; 32];
    let owner = AtomicSwapOwner::new(alice.account().unwrap(), bob.account().unwrap(), &hash_key);
    let swap = AtomicSwap::new(
        CHAIN_ID,
        Uint256::from(500u32),
        owner,
        1,
        5,
        Uint256::zero(),
        [9u8; 32],
    )
    .unwrap();
    (swap, alice, bob, hash_key)
}

fn spend_swap(swap: &AtomicSwap, to: &Secp256k1Signer) -> Tx {
    let mut tx = Tx::new(
        vec![swap.make_tx_in()],
        vec![value_store(to, 500)],
        Uint256::zero(),
    );
    tx.set_tx_hash().unwrap();
    tx
}

#[test]
fn test_atomic_swap_alternate_claims_while_live() -> anyhow::Result<()> {
    let (swap, _alice, bob, hash_key) = swap_fixture();
    let mut tx = spend_swap(&swap, &bob);
    swap.sign_as_alternate(&mut tx.vin_mut()[0], &bob, &hash_key)?;

    let utxo = TxOut::from(swap);
    utxo.validate_signature(1, &tx.vin()[0])?;
    utxo.validate_signature(4 * EPOCH_LENGTH, &tx.vin()[0])?;
    assert!(utxo.validate_signature(4 * EPOCH_LENGTH + 1, &tx.vin()[0]).is_err());
    Ok(())
}

#[test]
fn test_atomic_swap_primary_reclaims_after_expiry() -> anyhow::Result<()> {
    let (swap, alice, _bob, hash_key) = swap_fixture();
    let mut tx = spend_swap(&swap, &alice);
    swap.sign_as_primary(&mut tx.vin_mut()[0], &alice, &hash_key)?;

    let utxo = TxOut::from(swap);
    assert!(utxo.validate_signature(1, &tx.vin()[0]).is_err());
    utxo.validate_signature(5 * EPOCH_LENGTH, &tx.vin()[0])?;
    Ok(())
}

#[test]
fn test_atomic_swap_wrong_parties() -> anyhow::Result<()> {
    let (swap, alice, bob, hash_key) = swap_fixture();
    let mut tx = spend_swap(&swap, &bob);

    // the primary key cannot pose as the alternate
    swap.sign_as_alternate(&mut tx.vin_mut()[0], &alice, &hash_key)?;
    let utxo = TxOut::from(swap.clone());
    assert!(matches!(
        utxo.validate_signature(1, &tx.vin()[0]),
        Err(LedgerError::Authorization(_))
    ));

    // a wrong preimage never opens the lock
    assert!(swap.sign_as_alternate(&mut tx.vin_mut()[0], &bob, &[0u8; 32]).is_err());
    Ok(())
}
