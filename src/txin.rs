//! Transaction inputs.
//!
//! An input names the output it consumes by (transaction hash, output
//! index) and carries the owner's signature over its linker, which binds
//! the input to the spending transaction's hash.

use crate::codec::{write_u32, write_var_bytes, Canonical, Reader};
use crate::constants::DEPOSIT_TX_OUT_IDX;
use crate::crypto::keccak256;
use crate::error::{LedgerError, Result};
use crate::types::{make_utxo_id, Hash};

/// Reference to a consumed output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInPreImage {
    pub chain_id: u32,
    pub consumed_tx_idx: u32,
    pub consumed_tx_hash: Hash,
}

impl TxInPreImage {
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(LedgerError::InvalidObject("txin chain id is zero".to_string()));
        }
        Ok(())
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        Ok(keccak256(&[&self.marshal_binary()?[..]]))
    }

    pub fn utxo_id(&self) -> Hash {
        make_utxo_id(&self.consumed_tx_hash, self.consumed_tx_idx)
    }

    pub fn is_deposit(&self) -> bool {
        self.consumed_tx_idx == DEPOSIT_TX_OUT_IDX
    }
}

impl Canonical for TxInPreImage {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        write_u32(buf, self.chain_id);
        write_u32(buf, self.consumed_tx_idx);
        buf.extend_from_slice(&self.consumed_tx_hash);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = TxInPreImage {
            chain_id: reader.read_u32()?,
            consumed_tx_idx: reader.read_u32()?,
            consumed_tx_hash: reader.read_array()?,
        };
        preimage.validate()?;
        Ok(preimage)
    }
}

/// Pre-image bound to the spending transaction. This is the message every
/// consumption signature covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInLinker {
    pub preimage: TxInPreImage,
    pub tx_hash: Hash,
}

impl Canonical for TxInLinker {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.preimage.encode(buf)?;
        buf.extend_from_slice(&self.tx_hash);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(TxInLinker {
            preimage: TxInPreImage::decode(reader)?,
            tx_hash: reader.read_array()?,
        })
    }
}

/// Signed transaction input. The signature bytes are interpreted by the
/// consumed output's owner type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub linker: TxInLinker,
    pub signature: Vec<u8>,
}

impl TxIn {
    pub fn new(chain_id: u32, consumed_tx_idx: u32, consumed_tx_hash: Hash) -> Self {
        TxIn {
            linker: TxInLinker {
                preimage: TxInPreImage {
                    chain_id,
                    consumed_tx_idx,
                    consumed_tx_hash,
                },
                tx_hash: [0u8; 32],
            },
            signature: Vec::new(),
        }
    }

    pub fn chain_id(&self) -> u32 {
        self.linker.preimage.chain_id
    }

    pub fn consumed_tx_idx(&self) -> u32 {
        self.linker.preimage.consumed_tx_idx
    }

    pub fn consumed_tx_hash(&self) -> Hash {
        self.linker.preimage.consumed_tx_hash
    }

    /// Identifier of the consumed output
    pub fn utxo_id(&self) -> Hash {
        self.linker.preimage.utxo_id()
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        self.linker.preimage.pre_hash()
    }

    pub fn is_deposit(&self) -> bool {
        self.linker.preimage.is_deposit()
    }

    pub fn tx_hash(&self) -> Hash {
        self.linker.tx_hash
    }

    pub fn set_tx_hash(&mut self, tx_hash: Hash) {
        self.linker.tx_hash = tx_hash;
    }

    /// Bytes the consumption signature covers
    pub fn signing_message(&self) -> Result<Vec<u8>> {
        self.linker.marshal_binary()
    }

    /// Decode the opaque signature as `T`. A garbled signature only
    /// disqualifies this input, so it fails authorization.
    pub fn decode_signature<T: Canonical>(&self) -> Result<T> {
        T::unmarshal_binary(&self.signature)
            .map_err(|e| LedgerError::Authorization(format!("malformed input signature: {}", e)))
    }
}

impl Canonical for TxIn {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.linker.encode(buf)?;
        write_var_bytes(buf, &self.signature)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(TxIn {
            linker: TxInLinker::decode(reader)?,
            signature: reader.read_var_bytes()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut txin = TxIn::new(2, 1, [9u8; 32]);
        txin.set_tx_hash([4u8; 32]);
        txin.signature = vec![1, 2, 3];
        let bytes = txin.marshal_binary().unwrap();
        assert_eq!(TxIn::unmarshal_binary(&bytes).unwrap(), txin);
    }

    #[test]
    fn test_zero_chain_id_rejected() {
        let txin = TxIn::new(0, 1, [9u8; 32]);
        assert!(txin.marshal_binary().is_err());
        assert!(txin.pre_hash().is_err());
    }

    #[test]
    fn test_deposit_input() {
        let txin = TxIn::new(1, DEPOSIT_TX_OUT_IDX, [9u8; 32]);
        assert!(txin.is_deposit());
        assert_eq!(txin.utxo_id(), [9u8; 32]);
        assert!(!TxIn::new(1, 0, [9u8; 32]).is_deposit());
    }

    #[test]
    fn test_pre_hash_excludes_tx_hash_and_signature() {
        let mut a = TxIn::new(2, 0, [9u8; 32]);
        let before = a.pre_hash().unwrap();
        a.set_tx_hash([1u8; 32]);
        a.signature = vec![5u8; 65];
        assert_eq!(a.pre_hash().unwrap(), before);
    }

    #[test]
    fn test_signing_message_binds_tx_hash() {
        let mut a = TxIn::new(2, 0, [9u8; 32]);
        let before = a.signing_message().unwrap();
        a.set_tx_hash([1u8; 32]);
        assert_ne!(a.signing_message().unwrap(), before);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = TxIn::new(2, 0, [9u8; 32]).marshal_binary().unwrap();
        bytes.push(0);
        assert!(TxIn::unmarshal_binary(&bytes).is_err());
    }
}
