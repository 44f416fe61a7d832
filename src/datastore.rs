//! DataStore: a rent-paying data record keyed by (owner, index).
//!
//! The deposit buys a fixed number of epochs of storage. Once those are
//! exhausted the record expires and anyone may consume it, collecting the
//! remaining collateral.

use crate::codec::{write_u32, write_var_bytes, Canonical, Reader};
use crate::constants::*;
use crate::crypto::{keccak256, Signer};
use crate::economic::{
    base_deposit_equation, data_store_fee_equation, num_epochs_equation, reward_deposit_equation,
};
use crate::error::{LedgerError, Result};
use crate::owner::{DataStoreOwner, DataStoreSignature};
use crate::storage::StorageGetter;
use crate::txin::TxIn;
use crate::types::{epoch, make_utxo_id, Hash, HashMemo};
use crate::uint256::Uint256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DSPreImage {
    pub chain_id: u32,
    pub index: Hash,
    pub issued_at: u32,
    pub deposit: Uint256,
    pub raw_data: Vec<u8>,
    pub tx_out_idx: u32,
    pub owner: DataStoreOwner,
    pub fee: Uint256,
}

impl DSPreImage {
    pub fn data_size(&self) -> Result<u32> {
        let size = u32::try_from(self.raw_data.len())
            .map_err(|_| LedgerError::InvalidObject("raw data too large".to_string()))?;
        if size == 0 || size > MAX_DATASTORE_SIZE {
            return Err(LedgerError::InvalidObject(format!(
                "raw data size {} outside 1..={}",
                size, MAX_DATASTORE_SIZE
            )));
        }
        Ok(size)
    }

    /// Epochs of storage paid for by the deposit
    pub fn num_epochs(&self) -> Result<u32> {
        num_epochs_equation(self.data_size()?, &self.deposit)
    }

    /// ValidateDeposit
    ///
    /// 1. chainID ≠ 0 ∧ issuedAt ≠ 0 ∧ deposit ≠ 0
    /// 2. 0 < |rawData| ≤ MAX_DATASTORE_SIZE
    /// 3. numEpochs ≥ 1
    /// 4. BaseDepositEquation(|rawData|, numEpochs) = deposit
    pub fn validate_deposit(&self) -> Result<()> {
        // 1. Scalar fields
        if self.chain_id == 0 {
            return Err(LedgerError::InvalidObject("datastore chain id is zero".to_string()));
        }
        if self.issued_at == 0 {
            return Err(LedgerError::InvalidObject("datastore issued at epoch zero".to_string()));
        }
        if self.deposit.is_zero() {
            return Err(LedgerError::Economic("datastore deposit is zero".to_string()));
        }

        // 2. Payload size
        let data_size = self.data_size()?;

        // 3. At least one epoch paid
        let num_epochs = num_epochs_equation(data_size, &self.deposit)?;
        if num_epochs == 0 {
            return Err(LedgerError::Economic(
                "datastore deposit pays for no epochs".to_string(),
            ));
        }

        // 4. Deposit is exactly the price of those epochs
        if base_deposit_equation(data_size, num_epochs)? != self.deposit {
            return Err(LedgerError::Economic(format!(
                "deposit {} is not a whole number of epochs",
                self.deposit
            )));
        }
        Ok(())
    }

    /// First epoch in which the record is expired
    pub fn epoch_of_expiration(&self) -> Result<u32> {
        self.issued_at
            .checked_add(self.num_epochs()?)
            .and_then(|e| e.checked_add(1))
            .ok_or_else(|| LedgerError::Economic("epoch of expiration overflows".to_string()))
    }

    pub fn is_expired(&self, height: u32) -> Result<bool> {
        Ok(epoch(height) >= self.epoch_of_expiration()?)
    }

    /// Deposit value still owed to whoever consumes the record at `height`
    pub fn remaining_value(&self, height: u32) -> Result<Uint256> {
        let epoch_final = epoch(height).max(self.issued_at);
        reward_deposit_equation(&self.deposit, self.data_size()?, self.issued_at, epoch_final)
    }

    pub fn validate_fee<S: StorageGetter + ?Sized>(&self, storage: &S) -> Result<()> {
        let per_epoch = storage.get_data_store_epoch_fee()?;
        let expected = data_store_fee_equation(&per_epoch, self.num_epochs()?)?;
        if self.fee != expected {
            return Err(LedgerError::Economic(format!(
                "datastore fee {} does not match schedule {}",
                self.fee, expected
            )));
        }
        Ok(())
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        Ok(keccak256(&[&self.marshal_binary()?[..]]))
    }
}

impl Canonical for DSPreImage {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate_deposit()?;
        write_u32(buf, self.chain_id);
        buf.extend_from_slice(&self.index);
        write_u32(buf, self.issued_at);
        self.deposit.encode(buf)?;
        write_var_bytes(buf, &self.raw_data)?;
        write_u32(buf, self.tx_out_idx);
        self.owner.encode(buf)?;
        self.fee.encode(buf)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = DSPreImage {
            chain_id: reader.read_u32()?,
            index: reader.read_array()?,
            issued_at: reader.read_u32()?,
            deposit: Uint256::decode(reader)?,
            raw_data: reader.read_var_bytes()?,
            tx_out_idx: reader.read_u32()?,
            owner: DataStoreOwner::decode(reader)?,
            fee: Uint256::decode(reader)?,
        };
        preimage.validate_deposit()?;
        Ok(preimage)
    }
}

/// DataStore pre-image bound to its creating transaction. The owner's
/// creation signature covers this encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DSLinker {
    pub preimage: DSPreImage,
    pub tx_hash: Hash,
}

impl Canonical for DSLinker {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.preimage.encode(buf)?;
        buf.extend_from_slice(&self.tx_hash);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(DSLinker {
            preimage: DSPreImage::decode(reader)?,
            tx_hash: reader.read_array()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStore {
    linker: DSLinker,
    signature: Option<DataStoreSignature>,
    pre_hash: HashMemo,
    utxo_id: HashMemo,
}

impl DataStore {
    pub fn new(
        chain_id: u32,
        index: Hash,
        issued_at: u32,
        deposit: Uint256,
        raw_data: Vec<u8>,
        owner: DataStoreOwner,
        fee: Uint256,
    ) -> Result<Self> {
        let preimage = DSPreImage {
            chain_id,
            index,
            issued_at,
            deposit,
            raw_data,
            tx_out_idx: 0,
            owner,
            fee,
        };
        preimage.validate_deposit()?;
        Ok(Self::from_linker(
            DSLinker {
                preimage,
                tx_hash: [0u8; 32],
            },
            None,
        ))
    }

    pub fn from_linker(linker: DSLinker, signature: Option<DataStoreSignature>) -> Self {
        DataStore {
            linker,
            signature,
            pre_hash: HashMemo::default(),
            utxo_id: HashMemo::default(),
        }
    }

    pub fn preimage(&self) -> &DSPreImage {
        &self.linker.preimage
    }

    /// Mutable access; invalidates cached hashes
    pub fn preimage_mut(&mut self) -> &mut DSPreImage {
        self.pre_hash.clear();
        self.utxo_id.clear();
        &mut self.linker.preimage
    }

    pub fn linker(&self) -> &DSLinker {
        &self.linker
    }

    pub fn signature(&self) -> Option<&DataStoreSignature> {
        self.signature.as_ref()
    }

    pub fn owner(&self) -> &DataStoreOwner {
        &self.linker.preimage.owner
    }

    pub fn chain_id(&self) -> u32 {
        self.linker.preimage.chain_id
    }

    pub fn index(&self) -> Hash {
        self.linker.preimage.index
    }

    pub fn issued_at(&self) -> u32 {
        self.linker.preimage.issued_at
    }

    pub fn deposit(&self) -> Uint256 {
        self.linker.preimage.deposit
    }

    pub fn fee(&self) -> Uint256 {
        self.linker.preimage.fee
    }

    pub fn value_plus_fee(&self) -> Result<Uint256> {
        self.deposit().try_add(&self.fee())
    }

    pub fn tx_out_idx(&self) -> u32 {
        self.linker.preimage.tx_out_idx
    }

    pub fn set_tx_out_idx(&mut self, idx: u32) {
        self.preimage_mut().tx_out_idx = idx;
    }

    pub fn tx_hash(&self) -> Hash {
        self.linker.tx_hash
    }

    /// Rebinding to another transaction voids any creation signature
    pub fn set_tx_hash(&mut self, tx_hash: Hash) {
        if self.linker.tx_hash != tx_hash {
            self.signature = None;
        }
        self.utxo_id.clear();
        self.linker.tx_hash = tx_hash;
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        self.pre_hash.get_or_try_init(|| self.linker.preimage.pre_hash())
    }

    pub fn utxo_id(&self) -> Result<Hash> {
        self.utxo_id
            .get_or_try_init(|| Ok(make_utxo_id(&self.linker.tx_hash, self.tx_out_idx())))
    }

    /// Key claiming this (owner, index) slot: Keccak256(owner ‖ index)
    pub fn index_key(&self) -> Result<Hash> {
        let owner = self.owner().generic_owner().marshal_binary()?;
        Ok(keccak256(&[&owner[..], &self.linker.preimage.index[..]]))
    }

    pub fn epoch_of_expiration(&self) -> Result<u32> {
        self.linker.preimage.epoch_of_expiration()
    }

    pub fn is_expired(&self, height: u32) -> Result<bool> {
        self.linker.preimage.is_expired(height)
    }

    pub fn remaining_value(&self, height: u32) -> Result<Uint256> {
        self.linker.preimage.remaining_value(height)
    }

    pub fn validate_fee<S: StorageGetter + ?Sized>(&self, storage: &S) -> Result<()> {
        self.linker.preimage.validate_fee(storage)
    }

    /// Last height at which the creating transaction may be mined
    pub fn must_be_mined_before_height(&self) -> Result<u32> {
        self.issued_at()
            .checked_mul(EPOCH_LENGTH)
            .and_then(|h| h.checked_sub(1))
            .ok_or_else(|| LedgerError::InvalidObject("issued at epoch out of range".to_string()))
    }

    /// First height at which the creating transaction may be mined
    pub fn cannot_be_mined_before_height(&self) -> Result<u32> {
        self.issued_at()
            .checked_sub(1)
            .and_then(|e| e.checked_mul(EPOCH_LENGTH))
            .and_then(|h| h.checked_add(1))
            .ok_or_else(|| LedgerError::InvalidObject("issued at epoch out of range".to_string()))
    }

    /// Creation signature over the DSLinker encoding. Must run after the
    /// creating transaction's hash has been set.
    pub fn pre_sign<S: Signer + ?Sized>(&mut self, signer: &S) -> Result<()> {
        let msg = self.linker.marshal_binary()?;
        self.signature = Some(self.owner().sign(&msg, signer)?);
        Ok(())
    }

    pub fn validate_pre_signature(&self) -> Result<()> {
        let sig = self.signature.as_ref().ok_or_else(|| {
            LedgerError::Uninitialized("datastore creation signature missing".to_string())
        })?;
        let msg = self.linker.marshal_binary()?;
        self.owner().validate_signature(&msg, sig, false)
    }

    pub fn make_tx_in(&self) -> TxIn {
        TxIn::new(self.chain_id(), self.tx_out_idx(), self.linker.tx_hash)
    }

    /// Consumption signature over `txin`
    pub fn sign<S: Signer + ?Sized>(&self, txin: &mut TxIn, signer: &S) -> Result<()> {
        let msg = txin.signing_message()?;
        let sig = self.owner().sign(&msg, signer)?;
        txin.signature = sig.marshal_binary()?;
        Ok(())
    }

    pub fn validate_signature(&self, height: u32, txin: &TxIn) -> Result<()> {
        if txin.chain_id() != self.chain_id() {
            return Err(LedgerError::Authorization("txin chain id mismatch".to_string()));
        }
        let sig: DataStoreSignature = txin.decode_signature()?;
        let msg = txin.signing_message()?;
        self.owner()
            .validate_signature(&msg, &sig, self.is_expired(height)?)
    }
}

impl Canonical for DataStore {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        let sig = self.signature.as_ref().ok_or_else(|| {
            LedgerError::Uninitialized("datastore creation signature missing".to_string())
        })?;
        self.linker.encode(buf)?;
        sig.encode(buf)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let linker = DSLinker::decode(reader)?;
        let signature = DataStoreSignature::decode(reader)?;
        Ok(Self::from_linker(linker, Some(signature)))
    }
}
