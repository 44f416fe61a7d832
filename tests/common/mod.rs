//! Shared builders for integration tests

#![allow(dead_code)]

use ledger_objs::*;

pub const CHAIN_ID: u32 = 2;

pub fn signer(seed: u8) -> Secp256k1Signer {
    Secp256k1Signer::new(&[seed; 32]).unwrap()
}

pub fn owner_of(key: &Secp256k1Signer) -> Owner {
    Owner::new(key.account().unwrap(), CurveSpec::Secp256k1)
}

pub fn fees(min_tx_fee: u32) -> FeeSchedule {
    FeeSchedule {
        min_tx_fee: Uint256::from(min_tx_fee),
        ..FeeSchedule::default()
    }
}

/// Deposit-origin ValueStore owned by `key`
pub fn deposit(key: &Secp256k1Signer, value: u32, nonce: u8) -> TxOut {
    ValueStore::new_from_deposit(CHAIN_ID, Uint256::from(value), &owner_of(key), [nonce; 32])
        .unwrap()
        .into()
}

/// Fee-free ValueStore output owned by `key`
pub fn value_store(key: &Secp256k1Signer, value: u32) -> TxOut {
    let owner = ValueStoreOwner::new_from_owner(&owner_of(key));
    ValueStore::new(CHAIN_ID, Uint256::from(value), Uint256::zero(), owner, [0u8; 32])
        .unwrap()
        .into()
}

/// Fee-free DataStore paying for exactly `num_epochs`
pub fn data_store(
    key: &Secp256k1Signer,
    index: u8,
    issued_at: u32,
    raw_data: Vec<u8>,
    num_epochs: u32,
) -> DataStore {
    let size = raw_data.len() as u32;
    let deposit = ledger_objs::economic::base_deposit_equation(size, num_epochs).unwrap();
    let owner = DataStoreOwner::new_from_owner(&owner_of(key));
    DataStore::new(CHAIN_ID, [index; 32], issued_at, deposit, raw_data, owner, Uint256::zero())
        .unwrap()
}

/// Spend `consumed` into `vout`: stamp the hash, pre-sign created
/// DataStores and sign every ValueStore or DataStore input with `key`
pub fn build_tx(
    consumed: &[TxOut],
    vout: Vec<TxOut>,
    fee: u32,
    key: &Secp256k1Signer,
) -> anyhow::Result<Tx> {
    let vin = consumed
        .iter()
        .map(TxOut::make_tx_in)
        .collect::<Result<Vec<_>>>()?;
    let mut tx = Tx::new(vin, vout, Uint256::from(fee));
    tx.set_tx_hash()?;
    for out in tx.vout_mut().iter_mut() {
        if let TxOut::DataStore(ds) = out {
            ds.pre_sign(key)?;
        }
    }
    for (i, utxo) in consumed.iter().enumerate() {
        let txin = &mut tx.vin_mut()[i];
        match utxo {
            TxOut::ValueStore(vs) => vs.sign(txin, key)?,
            TxOut::DataStore(ds) => ds.sign(txin, key)?,
            _ => {}
        }
    }
    Ok(tx)
}
