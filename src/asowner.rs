//! Hashed-timelock owner and signature for AtomicSwap outputs.
//!
//! Two parties share one output. While the swap is live only the
//! Alternate party may spend it, after expiration only the Primary party
//! may reclaim it, and both must reveal the secret behind the hash lock.

use crate::codec::{Canonical, Reader};
use crate::crypto::{keccak256, recover_account, Secp256k1Signer, Signer};
use crate::error::{LedgerError, Result};
use crate::owner::Owner;
use crate::types::{Account, CurveSpec, Hash, SignerRole, Sva};
use serde::{Deserialize, Serialize};

/// One party of a swap. Only secp256k1 accounts may participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomicSwapSubOwner {
    pub curve_spec: CurveSpec,
    pub account: Account,
}

impl AtomicSwapSubOwner {
    pub fn new(account: Account) -> Self {
        AtomicSwapSubOwner {
            curve_spec: CurveSpec::Secp256k1,
            account,
        }
    }

    pub fn new_from_owner(owner: &Owner) -> Result<Self> {
        let sub = AtomicSwapSubOwner {
            curve_spec: owner.curve_spec,
            account: owner.account,
        };
        sub.validate()?;
        Ok(sub)
    }

    pub fn validate(&self) -> Result<()> {
        if self.curve_spec != CurveSpec::Secp256k1 {
            return Err(LedgerError::InvalidObject(
                "atomic swap owners must use secp256k1".to_string(),
            ));
        }
        Ok(())
    }

    /// Account must always match, regardless of expiration
    pub fn validate_signature(&self, msg: &[u8], sig: &AtomicSwapSignature) -> Result<()> {
        if sig.curve_spec != self.curve_spec {
            return Err(LedgerError::Authorization(
                "atomic swap signature curve mismatch".to_string(),
            ));
        }
        let account = recover_account(sig.curve_spec, msg, &sig.signature)?;
        if account != self.account {
            return Err(LedgerError::Authorization(
                "atomic swap signature from wrong account".to_string(),
            ));
        }
        Ok(())
    }
}

impl Canonical for AtomicSwapSubOwner {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        buf.push(self.curve_spec as u8);
        buf.extend_from_slice(&self.account);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let sub = AtomicSwapSubOwner {
            curve_spec: CurveSpec::try_from(reader.read_u8()?)?,
            account: reader.read_array()?,
        };
        sub.validate()?;
        Ok(sub)
    }
}

/// Signature spending an AtomicSwap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicSwapSignature {
    pub curve_spec: CurveSpec,
    pub signer_role: SignerRole,
    pub hash_key: Hash,
    pub signature: Vec<u8>,
}

impl AtomicSwapSignature {
    fn validate(&self) -> Result<()> {
        if self.curve_spec != CurveSpec::Secp256k1 {
            return Err(LedgerError::InvalidEncoding(
                "atomic swap signatures must use secp256k1".to_string(),
            ));
        }
        if self.signature.len() != self.curve_spec.signature_len() {
            return Err(LedgerError::InvalidEncoding(format!(
                "atomic swap signature must be {} bytes",
                self.curve_spec.signature_len()
            )));
        }
        Ok(())
    }
}

impl Canonical for AtomicSwapSignature {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        buf.push(Sva::HashedTimelock as u8);
        buf.push(self.curve_spec as u8);
        buf.push(self.signer_role as u8);
        buf.extend_from_slice(&self.hash_key);
        buf.extend_from_slice(&self.signature);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let sva = Sva::try_from(reader.read_u8()?)?;
        if sva != Sva::HashedTimelock {
            return Err(LedgerError::InvalidEncoding(format!(
                "SVA mismatch: expected HashedTimelock got {:?}",
                sva
            )));
        }
        let curve_spec = CurveSpec::try_from(reader.read_u8()?)?;
        let signer_role = SignerRole::try_from(reader.read_u8()?)?;
        let hash_key = reader.read_array()?;
        let signature = reader.read_bytes(curve_spec.signature_len())?.to_vec();
        let sig = AtomicSwapSignature {
            curve_spec,
            signer_role,
            hash_key,
            signature,
        };
        sig.validate()?;
        Ok(sig)
    }
}

/// Owner of an AtomicSwap: hash lock plus two secp256k1 parties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomicSwapOwner {
    pub hash_lock: Hash,
    pub primary: AtomicSwapSubOwner,
    pub alternate: AtomicSwapSubOwner,
}

impl AtomicSwapOwner {
    /// Lock the swap under Keccak256(hash_key)
    pub fn new(primary: Account, alternate: Account, hash_key: &Hash) -> Self {
        AtomicSwapOwner {
            hash_lock: keccak256(&[hash_key.as_slice()]),
            primary: AtomicSwapSubOwner::new(primary),
            alternate: AtomicSwapSubOwner::new(alternate),
        }
    }

    pub fn new_from_owner(primary: &Owner, alternate: &Owner, hash_key: &Hash) -> Result<Self> {
        Ok(AtomicSwapOwner {
            hash_lock: keccak256(&[hash_key.as_slice()]),
            primary: AtomicSwapSubOwner::new_from_owner(primary)?,
            alternate: AtomicSwapSubOwner::new_from_owner(alternate)?,
        })
    }

    /// The primary party represents the swap as a generic owner
    pub fn generic_owner(&self) -> Owner {
        Owner::new(self.primary.account, self.primary.curve_spec)
    }

    pub fn validate(&self) -> Result<()> {
        self.primary.validate()?;
        self.alternate.validate()
    }

    fn validate_hash_key(&self, hash_key: &Hash) -> Result<()> {
        if keccak256(&[hash_key.as_slice()]) != self.hash_lock {
            return Err(LedgerError::Authorization(
                "hash key does not open the hash lock".to_string(),
            ));
        }
        Ok(())
    }

    fn sign_as(
        &self,
        msg: &[u8],
        signer: &Secp256k1Signer,
        hash_key: &Hash,
        signer_role: SignerRole,
    ) -> Result<AtomicSwapSignature> {
        self.validate_hash_key(hash_key)?;
        Ok(AtomicSwapSignature {
            curve_spec: signer.curve_spec(),
            signer_role,
            hash_key: *hash_key,
            signature: signer.sign(msg)?,
        })
    }

    pub fn sign_as_primary(
        &self,
        msg: &[u8],
        signer: &Secp256k1Signer,
        hash_key: &Hash,
    ) -> Result<AtomicSwapSignature> {
        self.sign_as(msg, signer, hash_key, SignerRole::Primary)
    }

    pub fn sign_as_alternate(
        &self,
        msg: &[u8],
        signer: &Secp256k1Signer,
        hash_key: &Hash,
    ) -> Result<AtomicSwapSignature> {
        self.sign_as(msg, signer, hash_key, SignerRole::Alternate)
    }

    /// Primary may spend only once expired, Alternate only before
    pub fn validate_signature(
        &self,
        msg: &[u8],
        sig: &AtomicSwapSignature,
        is_expired: bool,
    ) -> Result<()> {
        self.validate_hash_key(&sig.hash_key)?;
        match sig.signer_role {
            SignerRole::Primary => {
                if !is_expired {
                    return Err(LedgerError::Authorization(
                        "primary may not spend before expiration".to_string(),
                    ));
                }
                self.primary.validate_signature(msg, sig)
            }
            SignerRole::Alternate => {
                if is_expired {
                    return Err(LedgerError::Authorization(
                        "alternate may not spend after expiration".to_string(),
                    ));
                }
                self.alternate.validate_signature(msg, sig)
            }
        }
    }
}

impl Canonical for AtomicSwapOwner {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.push(Sva::HashedTimelock as u8);
        buf.extend_from_slice(&self.hash_lock);
        self.primary.encode(buf)?;
        self.alternate.encode(buf)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let sva = Sva::try_from(reader.read_u8()?)?;
        if sva != Sva::HashedTimelock {
            return Err(LedgerError::InvalidEncoding(format!(
                "SVA mismatch: expected HashedTimelock got {:?}",
                sva
            )));
        }
        Ok(AtomicSwapOwner {
            hash_lock: reader.read_array()?,
            primary: AtomicSwapSubOwner::decode(reader)?,
            alternate: AtomicSwapSubOwner::decode(reader)?,
        })
    }
}
