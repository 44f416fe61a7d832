//! Hashing, signing and signature recovery.
//!
//! Keccak-256 is the only hash used by the ledger. Signatures come from
//! one of two curves, selected by `CurveSpec`; verification always
//! recovers the signer's public key and derives an account from it.

use crate::bn256;
use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::types::{Account, CurveSpec, Hash};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

/// Keccak256: 𝔹* → ℍ over the concatenation of `parts`
pub fn keccak256(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Signing capability. Implemented by exactly `Secp256k1Signer` and
/// `BnSigner`; callers dispatch on `curve_spec()`.
pub trait Signer: sealed::Sealed {
    fn curve_spec(&self) -> CurveSpec;

    /// Sign `msg`. The signature length is `curve_spec().signature_len()`.
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>>;

    fn pubkey(&self) -> Result<Vec<u8>>;

    /// Account this signer controls
    fn account(&self) -> Result<Account> {
        account_from_pubkey(self.curve_spec(), &self.pubkey()?)
    }
}

/// Derive an account: last 20 bytes of Keccak256(pubkey).
///
/// secp256k1 keys are hashed in uncompressed form without the 0x04 tag.
pub fn account_from_pubkey(curve: CurveSpec, pubkey: &[u8]) -> Result<Account> {
    let digest = match curve {
        CurveSpec::Secp256k1 => {
            if pubkey.len() != 65 || pubkey[0] != 0x04 {
                return Err(LedgerError::Crypto(
                    "secp256k1 pubkey must be 65 bytes uncompressed".to_string(),
                ));
            }
            keccak256(&[&pubkey[1..]])
        }
        CurveSpec::Bn256Eth => {
            if pubkey.len() != BN256_PUBKEY_LEN {
                return Err(LedgerError::Crypto(format!(
                    "bn256 pubkey must be {} bytes",
                    BN256_PUBKEY_LEN
                )));
            }
            keccak256(&[pubkey])
        }
    };
    let mut account = [0u8; OWNER_LEN];
    account.copy_from_slice(&digest[HASH_LEN - OWNER_LEN..]);
    Ok(account)
}

/// Verify `sig` over `msg` on `curve` and return the signer's account
pub fn recover_account(curve: CurveSpec, msg: &[u8], sig: &[u8]) -> Result<Account> {
    let pubkey = match curve {
        CurveSpec::Secp256k1 => secp256k1_recover(msg, sig)?,
        CurveSpec::Bn256Eth => bn256::verify(msg, sig)?,
    };
    account_from_pubkey(curve, &pubkey)
}

fn message_digest(msg: &[u8]) -> Result<Message> {
    Message::from_digest_slice(&keccak256(&[msg])).map_err(|e| LedgerError::Crypto(e.to_string()))
}

/// Recoverable ECDSA signer over secp256k1
#[derive(Debug, Clone)]
pub struct Secp256k1Signer {
    secret: SecretKey,
    public: PublicKey,
}

impl Secp256k1Signer {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(secret).map_err(|e| LedgerError::Crypto(e.to_string()))?;
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Secp256k1Signer { secret, public })
    }
}

impl sealed::Sealed for Secp256k1Signer {}

impl Signer for Secp256k1Signer {
    fn curve_spec(&self) -> CurveSpec {
        CurveSpec::Secp256k1
    }

    /// Signature layout: r ‖ s ‖ v over Keccak256(msg)
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let secp = Secp256k1::signing_only();
        let message = message_digest(msg)?;
        let (recid, compact) = secp
            .sign_ecdsa_recoverable(&message, &self.secret)
            .serialize_compact();
        let mut out = Vec::with_capacity(SECP256K1_SIG_LEN);
        out.extend_from_slice(&compact);
        out.push(recid.to_i32() as u8);
        Ok(out)
    }

    fn pubkey(&self) -> Result<Vec<u8>> {
        Ok(self.public.serialize_uncompressed().to_vec())
    }
}

/// Recover the uncompressed public key that produced `sig` over `msg`
pub fn secp256k1_recover(msg: &[u8], sig: &[u8]) -> Result<Vec<u8>> {
    if sig.len() != SECP256K1_SIG_LEN {
        return Err(LedgerError::Crypto(format!(
            "secp256k1 signature must be {} bytes, got {}",
            SECP256K1_SIG_LEN,
            sig.len()
        )));
    }
    let recid = RecoveryId::from_i32(sig[64] as i32).map_err(|e| LedgerError::Crypto(e.to_string()))?;
    let recoverable = RecoverableSignature::from_compact(&sig[..64], recid)
        .map_err(|e| LedgerError::Crypto(e.to_string()))?;
    let secp = Secp256k1::verification_only();
    let message = message_digest(msg)?;
    let pubkey = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| LedgerError::Authorization(format!("secp256k1 recovery failed: {}", e)))?;
    Ok(pubkey.serialize_uncompressed().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        // Keccak-256 of the empty string
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak_concatenation() {
        assert_eq!(keccak256(&[&b"ab"[..], &b"c"[..]]), keccak256(&[&b"abc"[..]]));
    }

    #[test]
    fn test_secp256k1_sign_recover() {
        let signer = Secp256k1Signer::new(&[1u8; 32]).unwrap();
        let sig = signer.sign(b"hello").unwrap();
        assert_eq!(sig.len(), SECP256K1_SIG_LEN);
        let pubkey = secp256k1_recover(b"hello", &sig).unwrap();
        assert_eq!(pubkey, signer.pubkey().unwrap());
        let account = recover_account(CurveSpec::Secp256k1, b"hello", &sig).unwrap();
        assert_eq!(account, signer.account().unwrap());
    }

    #[test]
    fn test_secp256k1_wrong_message() {
        let signer = Secp256k1Signer::new(&[1u8; 32]).unwrap();
        let sig = signer.sign(b"hello").unwrap();
        let account = recover_account(CurveSpec::Secp256k1, b"other", &sig);
        // recovery yields some key, just not the signer's
        if let Ok(account) = account {
            assert_ne!(account, signer.account().unwrap());
        }
    }

    #[test]
    fn test_secp256k1_bad_length() {
        assert!(secp256k1_recover(b"hello", &[0u8; 64]).is_err());
    }

    #[test]
    fn test_known_address() {
        // secret key 1 controls 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let signer = Secp256k1Signer::new(&secret).unwrap();
        assert_eq!(
            hex::encode(signer.account().unwrap()),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_invalid_secret() {
        assert!(Secp256k1Signer::new(&[0u8; 32]).is_err());
        assert!(Secp256k1Signer::new(&[1u8; 31]).is_err());
    }
}
