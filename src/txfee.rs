//! TxFee: an explicitly burned transaction fee output.

use crate::codec::{write_u32, Canonical, Reader};
use crate::crypto::keccak256;
use crate::error::{LedgerError, Result};
use crate::storage::StorageGetter;
use crate::types::{make_utxo_id, Hash, HashMemo};
use crate::uint256::Uint256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TFPreImage {
    pub chain_id: u32,
    pub tx_out_idx: u32,
    pub fee: Uint256,
}

impl TFPreImage {
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(LedgerError::InvalidObject("txfee chain id is zero".to_string()));
        }
        if self.fee.is_zero() {
            return Err(LedgerError::InvalidObject("txfee fee is zero".to_string()));
        }
        Ok(())
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        Ok(keccak256(&[&self.marshal_binary()?[..]]))
    }
}

impl Canonical for TFPreImage {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        write_u32(buf, self.chain_id);
        write_u32(buf, self.tx_out_idx);
        self.fee.encode(buf)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = TFPreImage {
            chain_id: reader.read_u32()?,
            tx_out_idx: reader.read_u32()?,
            fee: Uint256::decode(reader)?,
        };
        preimage.validate()?;
        Ok(preimage)
    }
}

/// Burned fee. Never spendable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFee {
    preimage: TFPreImage,
    tx_hash: Hash,
    pre_hash: HashMemo,
    utxo_id: HashMemo,
}

impl TxFee {
    pub fn new(chain_id: u32, fee: Uint256, tx_hash: Hash) -> Result<Self> {
        let preimage = TFPreImage {
            chain_id,
            tx_out_idx: 0,
            fee,
        };
        preimage.validate()?;
        Ok(Self::from_parts(preimage, tx_hash))
    }

    pub fn from_parts(preimage: TFPreImage, tx_hash: Hash) -> Self {
        TxFee {
            preimage,
            tx_hash,
            pre_hash: HashMemo::default(),
            utxo_id: HashMemo::default(),
        }
    }

    pub fn preimage(&self) -> &TFPreImage {
        &self.preimage
    }

    /// Mutable access; invalidates cached hashes
    pub fn preimage_mut(&mut self) -> &mut TFPreImage {
        self.pre_hash.clear();
        self.utxo_id.clear();
        &mut self.preimage
    }

    pub fn chain_id(&self) -> u32 {
        self.preimage.chain_id
    }

    pub fn fee(&self) -> Uint256 {
        self.preimage.fee
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

    pub fn pre_hash(&self) -> Result<Hash> {
        self.pre_hash.get_or_try_init(|| self.preimage.pre_hash())
    }

    pub fn utxo_id(&self) -> Result<Hash> {
        self.utxo_id
            .get_or_try_init(|| Ok(make_utxo_id(&self.tx_hash, self.preimage.tx_out_idx)))
    }

    /// A burned fee must at least meet the transaction minimum
    pub fn validate_fee<S: StorageGetter + ?Sized>(&self, storage: &S) -> Result<()> {
        let min = storage.get_min_tx_fee()?;
        if self.preimage.fee < min {
            return Err(LedgerError::Economic(format!(
                "txfee {} below minimum {}",
                self.preimage.fee, min
            )));
        }
        Ok(())
    }
}

impl Canonical for TxFee {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.preimage.encode(buf)?;
        buf.extend_from_slice(&self.tx_hash);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = TFPreImage::decode(reader)?;
        let tx_hash = reader.read_array()?;
        Ok(Self::from_parts(preimage, tx_hash))
    }
}
