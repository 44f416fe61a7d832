//! Ordered transaction sets, as carried by a block proposal.

use crate::codec::Canonical;
use crate::error::{LedgerError, Result};
use crate::storage::StorageGetter;
use crate::transaction::Tx;
use crate::txin::TxIn;
use crate::txout::TxOut;
use crate::types::{ExclusionSet, Hash};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxVec(Vec<Tx>);

impl From<Vec<Tx>> for TxVec {
    fn from(txs: Vec<Tx>) -> Self {
        TxVec(txs)
    }
}

impl TxVec {
    pub fn new() -> Self {
        TxVec(Vec::new())
    }

    pub fn push(&mut self, tx: Tx) {
        self.0.push(tx);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tx> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Tx> {
        self.0
    }

    /// One canonical encoding per transaction
    pub fn marshal_binary(&self) -> Result<Vec<Vec<u8>>> {
        self.0.iter().map(Tx::marshal_binary).collect()
    }

    pub fn unmarshal_binary(encoded: &[Vec<u8>]) -> Result<Self> {
        encoded
            .iter()
            .map(|bytes| Tx::unmarshal_binary(bytes))
            .collect::<Result<Vec<_>>>()
            .map(TxVec)
    }

    // ============================================================================
    // SET-WIDE CHECKS
    // ============================================================================

    /// No UTXOID is consumed or generated twice across the whole set
    pub fn validate_unique(&self, set: &mut ExclusionSet) -> Result<()> {
        self.for_each_tx("duplicate utxo", |tx| tx.validate_unique(set))
    }

    /// No (owner, index) DataStore slot is claimed twice across the set
    pub fn validate_data_store_indexes(&self, set: &mut ExclusionSet) -> Result<()> {
        self.for_each_tx("duplicate datastore index", |tx| {
            tx.validate_data_store_indexes(set)
        })
    }

    pub fn validate_chain_id(&self, chain_id: u32) -> Result<()> {
        self.for_each_tx("wrong chain id", |tx| tx.validate_chain_id(chain_id))
    }

    /// Structural checks before applying the set to state
    pub fn pre_validate_apply_state(&self, chain_id: u32) -> Result<()> {
        self.validate_chain_id(chain_id)?;
        self.validate_unique(&mut ExclusionSet::new())?;
        self.validate_data_store_indexes(&mut ExclusionSet::new())?;
        self.for_each_tx("bad tx hash", Tx::validate_tx_hash)
    }

    /// Full validation of every transaction against the referenced UTXO
    /// snapshot, with identifiers claimed in one shared set
    pub fn validate<S: StorageGetter + ?Sized>(
        &self,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        let mut set = ExclusionSet::new();
        self.for_each_tx("invalid transaction", |tx| {
            tx.validate(&mut set, height, consumed, storage)
        })?;
        debug!(txs = self.len(), height, "transaction set validated");
        Ok(())
    }

    pub fn pre_validate_pending(&self, chain_id: u32) -> Result<()> {
        self.for_each_tx("pending pre-validation", |tx| tx.pre_validate_pending(chain_id))
    }

    pub fn post_validate_pending<S: StorageGetter + ?Sized>(
        &self,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        self.for_each_tx("pending post-validation", |tx| {
            tx.post_validate_pending(height, consumed, storage)
        })
    }

    fn for_each_tx<F>(&self, what: &str, mut check: F) -> Result<()>
    where
        F: FnMut(&Tx) -> Result<()>,
    {
        for (i, tx) in self.0.iter().enumerate() {
            if let Err(e) = check(tx) {
                warn!(tx_index = i, error = %e, "{}", what);
                return Err(e);
            }
        }
        Ok(())
    }

    // ============================================================================
    // IDENTIFIERS
    // ============================================================================

    pub fn tx_hash(&self) -> Result<Vec<Hash>> {
        self.0.iter().map(Tx::tx_hash).collect()
    }

    pub fn consumed_tx_ins(&self) -> Vec<TxIn> {
        self.0.iter().flat_map(|tx| tx.vin().iter().cloned()).collect()
    }

    pub fn consumed_utxo_id(&self) -> Vec<Hash> {
        self.0.iter().flat_map(Tx::consumed_utxo_id).collect()
    }

    pub fn consumed_pre_hash(&self) -> Result<Vec<Hash>> {
        let mut out = Vec::new();
        for tx in &self.0 {
            out.extend(tx.consumed_pre_hash()?);
        }
        Ok(out)
    }

    pub fn consumed_is_deposit(&self) -> Vec<bool> {
        self.0.iter().flat_map(Tx::consumed_is_deposit).collect()
    }

    pub fn consumed_utxo_id_only_deposits(&self) -> Vec<Hash> {
        self.consumed_tx_ins()
            .iter()
            .filter(|txin| txin.is_deposit())
            .map(TxIn::utxo_id)
            .collect()
    }

    pub fn consumed_utxo_id_no_deposits(&self) -> Vec<Hash> {
        self.consumed_tx_ins()
            .iter()
            .filter(|txin| !txin.is_deposit())
            .map(TxIn::utxo_id)
            .collect()
    }

    pub fn consumed_pre_hash_only_deposits(&self) -> Result<Vec<Hash>> {
        self.consumed_tx_ins()
            .iter()
            .filter(|txin| txin.is_deposit())
            .map(TxIn::pre_hash)
            .collect()
    }

    pub fn generated_utxos(&self) -> Vec<TxOut> {
        self.0.iter().flat_map(|tx| tx.vout().iter().cloned()).collect()
    }

    pub fn generated_utxo_id(&self) -> Result<Vec<Hash>> {
        let mut out = Vec::new();
        for tx in &self.0 {
            out.extend(tx.generated_utxo_id()?);
        }
        Ok(out)
    }

    pub fn generated_pre_hash(&self) -> Result<Vec<Hash>> {
        let mut out = Vec::new();
        for tx in &self.0 {
            out.extend(tx.generated_pre_hash()?);
        }
        Ok(out)
    }

    /// Position of the transaction with hash `tx_hash`
    pub fn position(&self, tx_hash: &Hash) -> Result<usize> {
        for (i, tx) in self.0.iter().enumerate() {
            if &tx.tx_hash()? == tx_hash {
                return Ok(i);
            }
        }
        Err(LedgerError::InvalidObject(format!(
            "transaction {} not in set",
            hex::encode(tx_hash)
        )))
    }
}

impl<'a> IntoIterator for &'a TxVec {
    type Item = &'a Tx;
    type IntoIter = std::slice::Iter<'a, Tx>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Secp256k1Signer, Signer};
    use crate::owner::{Owner, ValueStoreOwner};
    use crate::storage::FeeSchedule;
    use crate::types::CurveSpec;
    use crate::uint256::Uint256;
    use crate::valuestore::ValueStore;

    const CHAIN_ID: u32 = 7;

    fn key() -> Secp256k1Signer {
        Secp256k1Signer::new(&[3u8; 32]).unwrap()
    }

    fn deposit(nonce: u8) -> TxOut {
        let owner = Owner::new(key().account().unwrap(), CurveSpec::Secp256k1);
        ValueStore::new_from_deposit(CHAIN_ID, Uint256::from(50u32), &owner, [nonce; 32])
            .unwrap()
            .into()
    }

    fn spend(utxo: &TxOut, value: u32) -> Tx {
        let owner = ValueStoreOwner::new(key().account().unwrap(), CurveSpec::Secp256k1);
        let out = ValueStore::new(CHAIN_ID, Uint256::from(value), Uint256::zero(), owner, [0u8; 32])
            .unwrap();
        let mut tx = Tx::new(
            vec![utxo.make_tx_in().unwrap()],
            vec![out.into()],
            Uint256::from(50 - value),
        );
        tx.set_tx_hash().unwrap();
        utxo.value_store()
            .unwrap()
            .sign(&mut tx.vin_mut()[0], &key())
            .unwrap();
        tx
    }

    #[test]
    fn test_validate_set() {
        let consumed = vec![deposit(1), deposit(2)];
        let txs = TxVec::from(vec![spend(&consumed[0], 45), spend(&consumed[1], 40)]);
        assert!(txs.pre_validate_apply_state(CHAIN_ID).is_ok());
        assert!(txs.validate(1, &consumed, &FeeSchedule::default()).is_ok());
        assert_eq!(txs.consumed_utxo_id_only_deposits().len(), 2);
        assert!(txs.consumed_utxo_id_no_deposits().is_empty());
        assert_eq!(txs.generated_utxos().len(), 2);
    }

    #[test]
    fn test_double_spend_across_txs() {
        let consumed = vec![deposit(1)];
        let txs = TxVec::from(vec![spend(&consumed[0], 45), spend(&consumed[0], 40)]);
        let mut set = ExclusionSet::new();
        assert!(matches!(txs.validate_unique(&mut set), Err(LedgerError::Conflict(_))));
        assert!(txs.validate(1, &consumed, &FeeSchedule::default()).is_err());
    }

    #[test]
    fn test_marshal_round_trip() {
        let consumed = vec![deposit(1), deposit(2)];
        let txs = TxVec::from(vec![spend(&consumed[0], 45), spend(&consumed[1], 40)]);
        let encoded = txs.marshal_binary().unwrap();
        assert_eq!(encoded.len(), 2);
        let decoded = TxVec::unmarshal_binary(&encoded).unwrap();
        assert_eq!(decoded, txs);
        assert_eq!(decoded.tx_hash().unwrap(), txs.tx_hash().unwrap());
    }

    #[test]
    fn test_position() {
        let consumed = vec![deposit(1), deposit(2)];
        let txs = TxVec::from(vec![spend(&consumed[0], 45), spend(&consumed[1], 40)]);
        let second = txs.tx_hash().unwrap()[1];
        assert_eq!(txs.position(&second).unwrap(), 1);
        assert!(txs.position(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_wrong_chain() {
        let consumed = vec![deposit(1)];
        let txs = TxVec::from(vec![spend(&consumed[0], 45)]);
        assert!(txs.validate_chain_id(CHAIN_ID + 1).is_err());
        assert!(txs.pre_validate_pending(CHAIN_ID).is_ok());
    }
}
