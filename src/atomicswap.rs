//! AtomicSwap: value locked under a hash lock with a time-based fallback.

use crate::asowner::{AtomicSwapOwner, AtomicSwapSignature};
use crate::codec::{write_u32, Canonical, Reader};
use crate::constants::EPOCH_LENGTH;
use crate::crypto::{keccak256, Secp256k1Signer};
use crate::error::{LedgerError, Result};
use crate::storage::StorageGetter;
use crate::txin::TxIn;
use crate::types::{epoch, make_utxo_id, Hash, HashMemo};
use crate::uint256::Uint256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASPreImage {
    pub chain_id: u32,
    pub value: Uint256,
    pub tx_out_idx: u32,
    pub owner: AtomicSwapOwner,
    pub issued_at: u32,
    pub exp: u32,
    pub fee: Uint256,
}

impl ASPreImage {
    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(LedgerError::InvalidObject("atomic swap chain id is zero".to_string()));
        }
        if self.value.is_zero() {
            return Err(LedgerError::InvalidObject("atomic swap value is zero".to_string()));
        }
        if self.issued_at == 0 {
            return Err(LedgerError::InvalidObject("atomic swap issued at epoch zero".to_string()));
        }
        if self.exp <= self.issued_at {
            return Err(LedgerError::InvalidObject(format!(
                "atomic swap expires at epoch {} not after issue epoch {}",
                self.exp, self.issued_at
            )));
        }
        self.owner.validate()
    }

    pub fn is_expired(&self, height: u32) -> bool {
        epoch(height) >= self.exp
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        Ok(keccak256(&[&self.marshal_binary()?[..]]))
    }
}

impl Canonical for ASPreImage {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        write_u32(buf, self.chain_id);
        self.value.encode(buf)?;
        write_u32(buf, self.tx_out_idx);
        self.owner.encode(buf)?;
        write_u32(buf, self.issued_at);
        write_u32(buf, self.exp);
        self.fee.encode(buf)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = ASPreImage {
            chain_id: reader.read_u32()?,
            value: Uint256::decode(reader)?,
            tx_out_idx: reader.read_u32()?,
            owner: AtomicSwapOwner::decode(reader)?,
            issued_at: reader.read_u32()?,
            exp: reader.read_u32()?,
            fee: Uint256::decode(reader)?,
        };
        preimage.validate()?;
        Ok(preimage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicSwap {
    preimage: ASPreImage,
    tx_hash: Hash,
    pre_hash: HashMemo,
    utxo_id: HashMemo,
}

impl AtomicSwap {
    pub fn new(
        chain_id: u32,
        value: Uint256,
        owner: AtomicSwapOwner,
        issued_at: u32,
        exp: u32,
        fee: Uint256,
        tx_hash: Hash,
    ) -> Result<Self> {
        let preimage = ASPreImage {
            chain_id,
            value,
            tx_out_idx: 0,
            owner,
            issued_at,
            exp,
            fee,
        };
        preimage.validate()?;
        Ok(Self::from_parts(preimage, tx_hash))
    }

    pub fn from_parts(preimage: ASPreImage, tx_hash: Hash) -> Self {
        AtomicSwap {
            preimage,
            tx_hash,
            pre_hash: HashMemo::default(),
            utxo_id: HashMemo::default(),
        }
    }

    pub fn preimage(&self) -> &ASPreImage {
        &self.preimage
    }

    /// Mutable access; invalidates cached hashes
    pub fn preimage_mut(&mut self) -> &mut ASPreImage {
        self.pre_hash.clear();
        self.utxo_id.clear();
        &mut self.preimage
    }

    pub fn owner(&self) -> &AtomicSwapOwner {
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

    pub fn issued_at(&self) -> u32 {
        self.preimage.issued_at
    }

    pub fn exp(&self) -> u32 {
        self.preimage.exp
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

    /// Expired once the current epoch reaches `exp`
    pub fn is_expired(&self, height: u32) -> bool {
        self.preimage.is_expired(height)
    }

    pub fn validate_fee<S: StorageGetter + ?Sized>(&self, storage: &S) -> Result<()> {
        let expected = storage.get_atomic_swap_fee()?;
        if self.preimage.fee != expected {
            return Err(LedgerError::Economic(format!(
                "atomic swap fee {} does not match schedule {}",
                self.preimage.fee, expected
            )));
        }
        Ok(())
    }

    pub fn must_be_mined_before_height(&self) -> Result<u32> {
        self.issued_at()
            .checked_mul(EPOCH_LENGTH)
            .and_then(|h| h.checked_sub(1))
            .ok_or_else(|| LedgerError::InvalidObject("issued at epoch out of range".to_string()))
    }

    pub fn cannot_be_mined_before_height(&self) -> Result<u32> {
        self.issued_at()
            .checked_sub(1)
            .and_then(|e| e.checked_mul(EPOCH_LENGTH))
            .and_then(|h| h.checked_add(1))
            .ok_or_else(|| LedgerError::InvalidObject("issued at epoch out of range".to_string()))
    }

    pub fn make_tx_in(&self) -> TxIn {
        TxIn::new(self.preimage.chain_id, self.preimage.tx_out_idx, self.tx_hash)
    }

    /// Reclaim after expiration
    pub fn sign_as_primary(&self, txin: &mut TxIn, signer: &Secp256k1Signer, hash_key: &Hash) -> Result<()> {
        let msg = txin.signing_message()?;
        let sig = self.owner().sign_as_primary(&msg, signer, hash_key)?;
        txin.signature = sig.marshal_binary()?;
        Ok(())
    }

    /// Claim while the swap is live
    pub fn sign_as_alternate(&self, txin: &mut TxIn, signer: &Secp256k1Signer, hash_key: &Hash) -> Result<()> {
        let msg = txin.signing_message()?;
        let sig = self.owner().sign_as_alternate(&msg, signer, hash_key)?;
        txin.signature = sig.marshal_binary()?;
        Ok(())
    }

    pub fn validate_signature(&self, height: u32, txin: &TxIn) -> Result<()> {
        if txin.chain_id() != self.preimage.chain_id {
            return Err(LedgerError::Authorization("txin chain id mismatch".to_string()));
        }
        let sig: AtomicSwapSignature = txin.decode_signature()?;
        let msg = txin.signing_message()?;
        self.owner()
            .validate_signature(&msg, &sig, self.is_expired(height))
    }
}

impl Canonical for AtomicSwap {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.preimage.encode(buf)?;
        buf.extend_from_slice(&self.tx_hash);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let preimage = ASPreImage::decode(reader)?;
        let tx_hash = reader.read_array()?;
        Ok(Self::from_parts(preimage, tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Signer;
    use crate::storage::FeeSchedule;

    const HASH_KEY: Hash = [42u8; 32];

    fn parties() -> (Secp256k1Signer, Secp256k1Signer) {
        (
            Secp256k1Signer::new(&[1u8; 32]).unwrap(),
            Secp256k1Signer::new(&[2u8; 32]).unwrap(),
        )
    }

    fn swap() -> AtomicSwap {
        let (primary, alternate) = parties();
        let owner = AtomicSwapOwner::new(
            primary.account().unwrap(),
            alternate.account().unwrap(),
            &HASH_KEY,
        );
        AtomicSwap::new(2, Uint256::from(100u32), owner, 1, 5, Uint256::zero(), [3u8; 32]).unwrap()
    }

    #[test]
    fn test_exp_must_follow_issue() {
        let owner = AtomicSwapOwner::new([1u8; 20], [2u8; 20], &HASH_KEY);
        assert!(AtomicSwap::new(2, Uint256::one(), owner, 5, 5, Uint256::zero(), [0u8; 32]).is_err());
        assert!(AtomicSwap::new(2, Uint256::zero(), owner, 1, 5, Uint256::zero(), [0u8; 32]).is_err());
        assert!(AtomicSwap::new(2, Uint256::one(), owner, 0, 5, Uint256::zero(), [0u8; 32]).is_err());
    }

    #[test]
    fn test_expiry() {
        let swap = swap();
        assert!(!swap.is_expired(1));
        assert!(!swap.is_expired(4 * EPOCH_LENGTH));
        assert!(swap.is_expired(4 * EPOCH_LENGTH + 1));
        assert!(swap.is_expired(5 * EPOCH_LENGTH));
    }

    #[test]
    fn test_primary_only_after_expiry() {
        let swap = swap();
        let (primary, _) = parties();
        let mut txin = swap.make_tx_in();
        swap.sign_as_primary(&mut txin, &primary, &HASH_KEY).unwrap();
        assert!(swap.validate_signature(1, &txin).is_err());
        assert!(swap.validate_signature(5 * EPOCH_LENGTH, &txin).is_ok());
    }

    #[test]
    fn test_alternate_only_before_expiry() {
        let swap = swap();
        let (_, alternate) = parties();
        let mut txin = swap.make_tx_in();
        swap.sign_as_alternate(&mut txin, &alternate, &HASH_KEY).unwrap();
        assert!(swap.validate_signature(1, &txin).is_ok());
        assert!(swap.validate_signature(5 * EPOCH_LENGTH, &txin).is_err());
    }

    #[test]
    fn test_wrong_hash_key() {
        let swap = swap();
        let (_, alternate) = parties();
        let mut txin = swap.make_tx_in();
        assert!(swap.sign_as_alternate(&mut txin, &alternate, &[0u8; 32]).is_err());
    }

    #[test]
    fn test_validate_fee() {
        let fees = FeeSchedule {
            atomic_swap_fee: Uint256::from(3u32),
            ..FeeSchedule::default()
        };
        let mut swap = swap();
        assert!(swap.validate_fee(&fees).is_err());
        swap.preimage_mut().fee = Uint256::from(3u32);
        assert!(swap.validate_fee(&fees).is_ok());
        assert_eq!(swap.value_plus_fee().unwrap(), Uint256::from(103u32));
    }

    #[test]
    fn test_round_trip() {
        let swap = swap();
        let bytes = swap.marshal_binary().unwrap();
        let decoded = AtomicSwap::unmarshal_binary(&bytes).unwrap();
        assert_eq!(decoded, swap);
        assert_eq!(decoded.marshal_binary().unwrap(), bytes);
    }

    #[test]
    fn test_mining_window() {
        let swap = swap();
        assert_eq!(swap.cannot_be_mined_before_height().unwrap(), 1);
        assert_eq!(swap.must_be_mined_before_height().unwrap(), EPOCH_LENGTH - 1);
    }
}
