//! ValueStore: a plain transferable token balance.

use crate::codec::{write_u32, Canonical, Reader};
use crate::constants::DEPOSIT_TX_OUT_IDX;
use crate::crypto::{keccak256, Signer};
use crate::error::{LedgerError, Result};
use crate::owner::{Owner, ValueStoreOwner, ValueStoreSignature};
use crate::storage::StorageGetter;
use crate::txin::TxIn;
use crate::types::{make_utxo_id, Hash, HashMemo};
use crate::uint256::Uint256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VSPreImage {
    pub chain_id: u32,
    pub value: Uint256,
    pub tx_out_idx: u32,
    pub owner: ValueStoreOwner,
    pub fee: Uint256,
}

impl VSPreImage {
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(LedgerError::InvalidObject("valuestore chain id is zero".to_string()));
        }
        if self.value.is_zero() {
            return Err(LedgerError::InvalidObject("valuestore value is zero".to_string()));
        }
        Ok(())
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        Ok(keccak256(&[&self.marshal_binary()?[..]]))
    }
}

impl Canonical for VSPreImage {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        write_u32(buf, self.chain_id);
        self.value.encode(buf)?;
        write_u32(buf, self.tx_out_idx);
        self.owner.encode(buf)?;
        self.fee.encode(buf)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = VSPreImage {
            chain_id: reader.read_u32()?,
            value: Uint256::decode(reader)?,
            tx_out_idx: reader.read_u32()?,
            owner: ValueStoreOwner::decode(reader)?,
            fee: Uint256::decode(reader)?,
        };
        preimage.validate()?;
        Ok(preimage)
    }
}

/// Token balance owned by one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueStore {
    preimage: VSPreImage,
    tx_hash: Hash,
    pre_hash: HashMemo,
    utxo_id: HashMemo,
}

impl ValueStore {
    pub fn new(
        chain_id: u32,
        value: Uint256,
        fee: Uint256,
        owner: ValueStoreOwner,
        tx_hash: Hash,
    ) -> Result<Self> {
        let preimage = VSPreImage {
            chain_id,
            value,
            tx_out_idx: 0,
            owner,
            fee,
        };
        preimage.validate()?;
        Ok(Self::from_parts(preimage, tx_hash))
    }

    /// ValueStore minted by an external deposit. The nonce stands in for
    /// the transaction hash and the output index is the deposit sentinel.
    pub fn new_from_deposit(chain_id: u32, value: Uint256, owner: &Owner, nonce: Hash) -> Result<Self> {
        let preimage = VSPreImage {
            chain_id,
            value,
            tx_out_idx: DEPOSIT_TX_OUT_IDX,
            owner: ValueStoreOwner::new_from_owner(owner),
            fee: Uint256::zero(),
        };
        preimage.validate()?;
        Ok(Self::from_parts(preimage, nonce))
    }

    pub fn from_parts(preimage: VSPreImage, tx_hash: Hash) -> Self {
        ValueStore {
            preimage,
            tx_hash,
            pre_hash: HashMemo::default(),
            utxo_id: HashMemo::default(),
        }
    }

    pub fn preimage(&self) -> &VSPreImage {
        &self.preimage
    }

    /// Mutable access; invalidates cached hashes
    pub fn preimage_mut(&mut self) -> &mut VSPreImage {
        self.pre_hash.clear();
        self.utxo_id.clear();
        &mut self.preimage
    }

    pub fn owner(&self) -> &ValueStoreOwner {
        &self.preimage.owner
    }

    pub fn chain_id(&self) -> u32 {
        self.preimage.chain_id
    }

    pub fn value(&self) -> Uint256 {
        self.preimage.value
    }

    pub fn fee(&self) -> Uint256 {
        self.preimage.fee
    }

    pub fn value_plus_fee(&self) -> Result<Uint256> {
        self.preimage.value.try_add(&self.preimage.fee)
    }

    pub fn tx_out_idx(&self) -> u32 {
        self.preimage.tx_out_idx
    }

    pub fn set_tx_out_idx(&mut self, idx: u32) {
        self.preimage_mut().tx_out_idx = idx;
    }

    pub fn tx_hash(&self) -> Hash {
        self.tx_hash
    }

    pub fn set_tx_hash(&mut self, tx_hash: Hash) {
        self.utxo_id.clear();
        self.tx_hash = tx_hash;
    }

    pub fn is_deposit(&self) -> bool {
        self.preimage.tx_out_idx == DEPOSIT_TX_OUT_IDX
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        self.pre_hash.get_or_try_init(|| self.preimage.pre_hash())
    }

    pub fn utxo_id(&self) -> Result<Hash> {
        self.utxo_id
            .get_or_try_init(|| Ok(make_utxo_id(&self.tx_hash, self.preimage.tx_out_idx)))
    }

    /// Deposits are free; everything else pays the scheduled fee exactly
    pub fn validate_fee<S: StorageGetter + ?Sized>(&self, storage: &S) -> Result<()> {
        if self.is_deposit() {
            if !self.preimage.fee.is_zero() {
                return Err(LedgerError::Economic("deposit carries a fee".to_string()));
            }
            return Ok(());
        }
        let expected = storage.get_value_store_fee()?;
        if self.preimage.fee != expected {
            return Err(LedgerError::Economic(format!(
                "valuestore fee {} does not match schedule {}",
                self.preimage.fee, expected
            )));
        }
        Ok(())
    }

    pub fn make_tx_in(&self) -> TxIn {
        TxIn::new(self.preimage.chain_id, self.preimage.tx_out_idx, self.tx_hash)
    }

    /// Sign `txin` as the owner
    pub fn sign<S: Signer + ?Sized>(&self, txin: &mut TxIn, signer: &S) -> Result<()> {
        let msg = txin.signing_message()?;
        let sig = self.preimage.owner.sign(&msg, signer)?;
        txin.signature = sig.marshal_binary()?;
        Ok(())
    }

    pub fn validate_signature(&self, txin: &TxIn) -> Result<()> {
        if txin.chain_id() != self.preimage.chain_id {
            return Err(LedgerError::Authorization("txin chain id mismatch".to_string()));
        }
        let sig: ValueStoreSignature = txin.decode_signature()?;
        let msg = txin.signing_message()?;
        self.preimage.owner.validate_signature(&msg, &sig)
    }
}

impl Canonical for ValueStore {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.preimage.encode(buf)?;
        buf.extend_from_slice(&self.tx_hash);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = VSPreImage::decode(reader)?;
        let tx_hash = reader.read_array()?;
        Ok(Self::from_parts(preimage, tx_hash))
    }
}
