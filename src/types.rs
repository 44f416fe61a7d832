//! Core ledger types shared by every object

use crate::constants::*;
use crate::crypto::keccak256;
use crate::error::{LedgerError, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Hash type: 256-bit Keccak digest
pub type Hash = [u8; HASH_LEN];

/// Account type: 160-bit address derived from a public key
pub type Account = [u8; OWNER_LEN];

/// Set of UTXO identifiers (and DataStore index keys) already claimed in
/// the current validation scope
pub type ExclusionSet = HashSet<Hash>;

/// Signature scheme of an owner or signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CurveSpec {
    Secp256k1 = 1,
    Bn256Eth = 2,
}

impl CurveSpec {
    /// Exact signature length produced by this curve's signer
    pub fn signature_len(self) -> usize {
        match self {
            CurveSpec::Secp256k1 => SECP256K1_SIG_LEN,
            CurveSpec::Bn256Eth => BN256_SIG_LEN,
        }
    }
}

impl TryFrom<u8> for CurveSpec {
    type Error = LedgerError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(CurveSpec::Secp256k1),
            2 => Ok(CurveSpec::Bn256Eth),
            other => Err(LedgerError::InvalidEncoding(format!(
                "unknown curve spec {}",
                other
            ))),
        }
    }
}

/// Signature Verification Algorithm: tags owners and signatures with the
/// asset kind they belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Sva {
    ValueStore = 1,
    HashedTimelock = 2,
    DataStore = 3,
}

impl TryFrom<u8> for Sva {
    type Error = LedgerError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Sva::ValueStore),
            2 => Ok(Sva::HashedTimelock),
            3 => Ok(Sva::DataStore),
            other => Err(LedgerError::InvalidEncoding(format!(
                "unknown SVA {}",
                other
            ))),
        }
    }
}

/// Party of a hashed-timelock swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignerRole {
    Primary = 1,
    Alternate = 2,
}

impl TryFrom<u8> for SignerRole {
    type Error = LedgerError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(SignerRole::Primary),
            2 => Ok(SignerRole::Alternate),
            other => Err(LedgerError::InvalidEncoding(format!(
                "unknown signer role {}",
                other
            ))),
        }
    }
}

/// Epoch: ℕ → ℕ⁺
///
/// Heights 0..=EPOCH_LENGTH belong to epoch 1, afterwards
/// epoch = ⌈height / EPOCH_LENGTH⌉.
pub fn epoch(height: u32) -> u32 {
    if height <= EPOCH_LENGTH {
        return 1;
    }
    if height % EPOCH_LENGTH == 0 {
        return height / EPOCH_LENGTH;
    }
    height / EPOCH_LENGTH + 1
}

/// MakeUTXOID: ℍ × ℕ → ℍ
///
/// A deposit (index = u32::MAX) is identified by its nonce directly,
/// every other output by Keccak256(txHash ‖ idx_be32).
pub fn make_utxo_id(tx_hash: &Hash, idx: u32) -> Hash {
    if idx == DEPOSIT_TX_OUT_IDX {
        return *tx_hash;
    }
    keccak256(&[tx_hash.as_slice(), &idx.to_be_bytes()[..]])
}

/// Compute-once hash cache owned by an object.
///
/// Equality ignores the cache so a memoized and a fresh copy of the same
/// object still compare equal.
#[derive(Clone, Default)]
pub(crate) struct HashMemo(OnceCell<Hash>);

impl HashMemo {
    pub(crate) fn get_or_try_init<F>(&self, f: F) -> Result<Hash>
    where
        F: FnOnce() -> Result<Hash>,
    {
        self.0.get_or_try_init(f).copied()
    }

    pub(crate) fn clear(&mut self) {
        self.0.take();
    }
}

impl PartialEq for HashMemo {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for HashMemo {}

impl fmt::Debug for HashMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(h) => write!(f, "HashMemo({})", hex::encode(h)),
            None => write!(f, "HashMemo(<unset>)"),
        }
    }
}
