//! Transaction commitment and validation.
//!
//! A transaction consumes referenced UTXOs (`vin`) and creates new ones
//! (`vout`). Its hash is the sparse Merkle trie root over both sides and is
//! stamped onto every input and output, binding signatures to the whole
//! transaction.

use crate::codec::{write_u32, Canonical, Reader};
use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::smt;
use crate::storage::StorageGetter;
use crate::txin::TxIn;
use crate::txout::TxOut;
use crate::types::{epoch, make_utxo_id, ExclusionSet, Hash, HashMemo};
use crate::uint256::Uint256;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

fn idx_u32(i: usize) -> Result<u32> {
    u32::try_from(i).map_err(|_| LedgerError::InvalidObject("output index overflows".to_string()))
}

fn check_vector_len(name: &str, len: usize) -> Result<()> {
    if len == 0 {
        return Err(LedgerError::InvalidObject(format!("{} is empty", name)));
    }
    if len > MAX_TX_VECTOR_LENGTH {
        return Err(LedgerError::InvalidObject(format!(
            "{} has {} entries, maximum is {}",
            name, len, MAX_TX_VECTOR_LENGTH
        )));
    }
    Ok(())
}

/// Ledger transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    vin: Vec<TxIn>,
    vout: Vec<TxOut>,
    fee: Uint256,
    tx_hash: HashMemo,
}

impl Tx {
    pub fn new(vin: Vec<TxIn>, vout: Vec<TxOut>, fee: Uint256) -> Self {
        Tx {
            vin,
            vout,
            fee,
            tx_hash: HashMemo::default(),
        }
    }

    pub fn vin(&self) -> &[TxIn] {
        &self.vin
    }

    pub fn vout(&self) -> &[TxOut] {
        &self.vout
    }

    /// Mutable inputs; invalidates the cached hash
    pub fn vin_mut(&mut self) -> &mut Vec<TxIn> {
        self.tx_hash.clear();
        &mut self.vin
    }

    /// Mutable outputs; invalidates the cached hash
    pub fn vout_mut(&mut self) -> &mut Vec<TxOut> {
        self.tx_hash.clear();
        &mut self.vout
    }

    pub fn fee(&self) -> Uint256 {
        self.fee
    }

    pub fn set_fee(&mut self, fee: Uint256) {
        self.fee = fee;
    }

    // ============================================================================
    // COMMITMENT
    // ============================================================================

    /// TxHash: root of the trie over
    /// {(UTXOID(in), PreHash(in))} ∪ {(MakeUTXOID(PreHash(out), i), PreHash(out))}
    ///
    /// Outputs must already sit at their positional index.
    pub fn tx_hash(&self) -> Result<Hash> {
        self.tx_hash.get_or_try_init(|| self.compute_tx_hash())
    }

    fn compute_tx_hash(&self) -> Result<Hash> {
        self.validate_tx_out_idx()?;
        let mut leaves = Vec::with_capacity(self.vin.len() + self.vout.len());
        for txin in &self.vin {
            leaves.push((txin.utxo_id(), txin.pre_hash()?));
        }
        for (i, out) in self.vout.iter().enumerate() {
            let pre_hash = out.pre_hash()?;
            leaves.push((make_utxo_id(&pre_hash, idx_u32(i)?), pre_hash));
        }
        smt::compute_root(leaves)
    }

    /// Assign positional output indexes, compute the hash and stamp it onto
    /// every input and output. Signing happens after this.
    pub fn set_tx_hash(&mut self) -> Result<Hash> {
        for (i, out) in self.vout.iter_mut().enumerate() {
            out.set_tx_out_idx(idx_u32(i)?);
        }
        self.tx_hash.clear();
        let tx_hash = self.tx_hash()?;
        for txin in &mut self.vin {
            txin.set_tx_hash(tx_hash);
        }
        for out in &mut self.vout {
            out.set_tx_hash(tx_hash);
        }
        Ok(tx_hash)
    }

    /// Every input and output must carry the recomputed hash
    pub fn validate_tx_hash(&self) -> Result<()> {
        let tx_hash = self.compute_tx_hash()?;
        if self.vin.iter().any(|txin| txin.tx_hash() != tx_hash)
            || self.vout.iter().any(|out| out.tx_hash() != tx_hash)
        {
            return Err(LedgerError::Conflict(format!(
                "tx hash mismatch, expected {}",
                hex::encode(tx_hash)
            )));
        }
        Ok(())
    }

    /// Output `i` must declare index `i`
    pub fn validate_tx_out_idx(&self) -> Result<()> {
        for (i, out) in self.vout.iter().enumerate() {
            if out.tx_out_idx() != idx_u32(i)? {
                return Err(LedgerError::Conflict(format!(
                    "output {} declares index {}",
                    i,
                    out.tx_out_idx()
                )));
            }
        }
        Ok(())
    }

    // ============================================================================
    // IDENTIFIERS
    // ============================================================================

    pub fn consumed_utxo_id(&self) -> Vec<Hash> {
        self.vin.iter().map(TxIn::utxo_id).collect()
    }

    pub fn consumed_pre_hash(&self) -> Result<Vec<Hash>> {
        self.vin.iter().map(TxIn::pre_hash).collect()
    }

    pub fn consumed_is_deposit(&self) -> Vec<bool> {
        self.vin.iter().map(TxIn::is_deposit).collect()
    }

    pub fn generated_utxo_id(&self) -> Result<Vec<Hash>> {
        self.vout.iter().map(TxOut::utxo_id).collect()
    }

    pub fn generated_pre_hash(&self) -> Result<Vec<Hash>> {
        self.vout.iter().map(TxOut::pre_hash).collect()
    }

    // ============================================================================
    // STRUCTURAL CHECKS
    // ============================================================================

    pub fn validate_chain_id(&self, chain_id: u32) -> Result<()> {
        if chain_id == 0 {
            return Err(LedgerError::InvalidObject("chain id is zero".to_string()));
        }
        let vin_ok = self.vin.iter().all(|txin| txin.chain_id() == chain_id);
        let vout_ok = self.vout.iter().all(|out| out.chain_id() == chain_id);
        if !vin_ok || !vout_ok {
            return Err(LedgerError::InvalidObject(format!(
                "transaction not bound to chain {}",
                chain_id
            )));
        }
        Ok(())
    }

    /// Claim every consumed and generated UTXOID in `set`
    pub fn validate_unique(&self, set: &mut ExclusionSet) -> Result<()> {
        let generated = self.generated_utxo_id()?;
        for id in self.consumed_utxo_id().into_iter().chain(generated) {
            if !set.insert(id) {
                return Err(LedgerError::Conflict(format!(
                    "utxo {} referenced twice",
                    hex::encode(id)
                )));
            }
        }
        Ok(())
    }

    /// Claim the (owner, index) slot of every created DataStore in `set`
    pub fn validate_data_store_indexes(&self, set: &mut ExclusionSet) -> Result<()> {
        for out in &self.vout {
            if let TxOut::DataStore(ds) = out {
                let key = ds.index_key()?;
                if !set.insert(key) {
                    return Err(LedgerError::Conflict(format!(
                        "datastore index {} claimed twice",
                        hex::encode(ds.index())
                    )));
                }
            }
        }
        Ok(())
    }

    /// Only DataStore outputs carry creation signatures
    pub fn validate_pre_signature(&self) -> Result<()> {
        self.vout.iter().try_for_each(TxOut::validate_pre_signature)
    }

    // ============================================================================
    // REFERENCED UTXOS
    // ============================================================================

    /// Match each input to its referenced UTXO
    fn resolve_consumed<'a>(&self, consumed: &'a [TxOut]) -> Result<Vec<&'a TxOut>> {
        let mut by_id = HashMap::with_capacity(consumed.len());
        for utxo in consumed {
            by_id.insert(utxo.utxo_id()?, utxo);
        }
        self.vin
            .iter()
            .map(|txin| {
                by_id.get(&txin.utxo_id()).copied().ok_or_else(|| {
                    LedgerError::InvalidObject(format!(
                        "referenced utxo {} not found",
                        hex::encode(txin.utxo_id())
                    ))
                })
            })
            .collect()
    }

    /// Σ RemainingValue(consumed, h) = Σ ValuePlusFee(vout) + fee
    /// where h = max(height, CannotBeMinedUntil)
    pub fn validate_equal_vin_vout(&self, height: u32, consumed: &[TxOut]) -> Result<()> {
        let height = height.max(self.cannot_be_mined_until()?);
        let mut value_in = Uint256::zero();
        for utxo in self.resolve_consumed(consumed)? {
            value_in = value_in.try_add(&utxo.remaining_value(height)?)?;
        }
        let mut value_out = self.fee;
        for out in &self.vout {
            value_out = value_out.try_add(&out.value_plus_fee()?)?;
        }
        if value_in != value_out {
            return Err(LedgerError::Economic(format!(
                "inputs {} do not balance outputs plus fee {}",
                value_in, value_out
            )));
        }
        Ok(())
    }

    /// Shape of a cleanup transaction, without looking at referenced UTXOs:
    /// zero fee and a single fee-free ValueStore output
    pub fn is_potential_cleanup_tx(&self) -> bool {
        if !self.fee.is_zero() || self.vin.is_empty() {
            return false;
        }
        match self.vout.as_slice() {
            [TxOut::ValueStore(vs)] => vs.fee().is_zero(),
            _ => false,
        }
    }

    /// A cleanup transaction collects expired DataStores into one
    /// ValueStore and is exempt from fees
    pub fn is_cleanup_tx(&self, height: u32, consumed: &[TxOut]) -> bool {
        if !self.is_potential_cleanup_tx() {
            return false;
        }
        let Ok(resolved) = self.resolve_consumed(consumed) else {
            return false;
        };
        let all_expired = resolved.iter().all(|utxo| match utxo {
            TxOut::DataStore(ds) => ds.is_expired(height).unwrap_or(false),
            _ => false,
        });
        all_expired && self.validate_equal_vin_vout(height, consumed).is_ok()
    }

    /// Every output pays its scheduled fee and the transaction pays at
    /// least the minimum, unless it is a cleanup transaction
    pub fn validate_fees<S: StorageGetter + ?Sized>(
        &self,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        if self.is_cleanup_tx(height, consumed) {
            debug!(height, "cleanup transaction exempt from fees");
            return Ok(());
        }
        for out in &self.vout {
            out.validate_fee(storage)?;
        }
        let min = storage.get_min_tx_fee()?;
        if self.fee < min {
            return Err(LedgerError::Economic(format!(
                "transaction fee {} below minimum {}",
                self.fee, min
            )));
        }
        Ok(())
    }

    /// Each input is authorised by the owner of the UTXO it consumes
    pub fn validate_signature(&self, height: u32, consumed: &[TxOut]) -> Result<()> {
        let resolved = self.resolve_consumed(consumed)?;
        for (txin, utxo) in self.vin.iter().zip(resolved) {
            utxo.validate_signature(height, txin)?;
        }
        Ok(())
    }

    // ============================================================================
    // MINING WINDOW
    // ============================================================================

    /// Earliest height at which every output may be mined
    pub fn cannot_be_mined_until(&self) -> Result<u32> {
        let mut height = 1;
        for out in &self.vout {
            height = height.max(out.cannot_be_mined_before_height()?);
        }
        Ok(height)
    }

    /// Issue epoch shared by every time-bound output, None if there are none
    fn issued_at_epoch(&self) -> Result<Option<u32>> {
        let mut deadlines = BTreeSet::new();
        for out in &self.vout {
            let mbh = out.must_be_mined_before_height()?;
            if mbh != u32::MAX {
                deadlines.insert(mbh);
            }
        }
        let mut iter = deadlines.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Ok(None),
            (Some(&mbh), None) => Ok(Some(epoch(mbh))),
            _ => Err(LedgerError::InvalidObject(
                "outputs disagree on issued at epoch".to_string(),
            )),
        }
    }

    /// All time-bound outputs must agree on their issue epoch and that
    /// epoch must be the current one
    pub fn validate_issued_at_for_mining(&self, height: u32) -> Result<()> {
        match self.issued_at_epoch()? {
            Some(issued_at) if issued_at != epoch(height) => Err(LedgerError::InvalidObject(format!(
                "issued at epoch {} is not current epoch {}",
                issued_at,
                epoch(height)
            ))),
            _ => Ok(()),
        }
    }

    /// Epoch the transaction must be mined in, u32::MAX if unconstrained
    pub fn epoch_of_expiration_for_mining(&self) -> Result<u32> {
        Ok(self.issued_at_epoch()?.unwrap_or(u32::MAX))
    }

    // ============================================================================
    // PIPELINES
    // ============================================================================

    /// Block-level validation against the referenced UTXO snapshot,
    /// claiming identifiers in the shared `set`
    pub fn validate<S: StorageGetter + ?Sized>(
        &self,
        set: &mut ExclusionSet,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        self.validate_tx_out_idx()?;
        self.validate_tx_hash()?;
        self.validate_data_store_indexes(set)?;
        self.validate_unique(set)?;
        self.validate_pre_signature()?;
        self.validate_equal_vin_vout(height, consumed)?;
        self.validate_fees(height, consumed, storage)?;
        self.validate_signature(height, consumed)
    }

    /// Stateless checks before a transaction enters the pending pool
    pub fn pre_validate_pending(&self, chain_id: u32) -> Result<()> {
        self.pre_validate_pending_inner(chain_id).map_err(|e| {
            debug!(error = %e, "pending transaction failed pre-validation");
            e
        })
    }

    fn pre_validate_pending_inner(&self, chain_id: u32) -> Result<()> {
        check_vector_len("vin", self.vin.len())?;
        check_vector_len("vout", self.vout.len())?;
        self.validate_chain_id(chain_id)?;
        let mut set = ExclusionSet::new();
        self.validate_unique(&mut set)?;
        self.validate_data_store_indexes(&mut set)?;
        self.validate_tx_hash()?;
        self.validate_pre_signature()
    }

    /// Checks that need the referenced UTXOs and the fee schedule
    pub fn post_validate_pending<S: StorageGetter + ?Sized>(
        &self,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        self.post_validate_pending_inner(height, consumed, storage)
            .map_err(|e| {
                debug!(error = %e, height, "pending transaction failed post-validation");
                e
            })
    }

    fn post_validate_pending_inner<S: StorageGetter + ?Sized>(
        &self,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        self.validate_equal_vin_vout(height, consumed)?;
        self.validate_fees(height, consumed, storage)?;
        self.validate_signature(height, consumed)
    }
}

impl Canonical for Tx {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        check_vector_len("vin", self.vin.len())?;
        check_vector_len("vout", self.vout.len())?;
        let start = buf.len();
        write_u32(buf, idx_u32(self.vin.len())?);
        for txin in &self.vin {
            txin.encode(buf)?;
        }
        write_u32(buf, idx_u32(self.vout.len())?);
        for out in &self.vout {
            out.encode(buf)?;
        }
        self.fee.encode(buf)?;
        if buf.len() - start > MAX_TX_SIZE {
            return Err(LedgerError::InvalidObject(format!(
                "transaction of {} bytes exceeds maximum {}",
                buf.len() - start,
                MAX_TX_SIZE
            )));
        }
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let vin_len = reader.read_u32()? as usize;
        check_vector_len("vin", vin_len)?;
        let vin = (0..vin_len)
            .map(|_| TxIn::decode(reader))
            .collect::<Result<Vec<_>>>()?;
        let vout_len = reader.read_u32()? as usize;
        check_vector_len("vout", vout_len)?;
        let vout = (0..vout_len)
            .map(|_| TxOut::decode(reader))
            .collect::<Result<Vec<_>>>()?;
        let fee = Uint256::decode(reader)?;
        Ok(Tx::new(vin, vout, fee))
    }

    fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        if data.is_empty() || data.len() > MAX_TX_SIZE {
            return Err(LedgerError::InvalidEncoding(format!(
                "transaction encoding of {} bytes outside 1..={}",
                data.len(),
                MAX_TX_SIZE
            )));
        }
        let mut reader = Reader::new(data);
        let tx = Tx::decode(&mut reader)?;
        reader.finish()?;
        Ok(tx)
    }
}
