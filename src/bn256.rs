//! BLS signatures on the BN256 (alt_bn128) pairing curve.
//!
//! Public keys live in G2, signatures in G1. A signature on the wire is the
//! uncompressed G2 public key followed by the uncompressed G1 point, so a
//! verifier can recover the signer from the signature alone.

use crate::constants::*;
use crate::crypto::{keccak256, sealed, Signer};
use crate::error::{LedgerError, Result};
use crate::types::CurveSpec;
use ark_bn254::{Bn254, Fq, Fr, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

fn ser_err(e: ark_serialize::SerializationError) -> LedgerError {
    LedgerError::Crypto(format!("bn256 serialization: {}", e))
}

/// Map a message onto G1 by try-and-increment over Keccak256(counter ‖ msg)
pub fn hash_to_g1(msg: &[u8]) -> Result<G1Affine> {
    for counter in 0u8..=u8::MAX {
        let digest = keccak256(&[&[counter][..], msg]);
        let x = Fq::from_be_bytes_mod_order(&digest);
        if let Some(point) = G1Affine::get_point_from_x_unchecked(x, false) {
            // G1 has cofactor one so every curve point is in the subgroup
            if !point.is_zero() {
                return Ok(point);
            }
        }
    }
    Err(LedgerError::Crypto("hash to G1 exhausted counter".to_string()))
}

/// BLS signer over BN256
#[derive(Debug, Clone)]
pub struct BnSigner {
    secret: Fr,
    public: G2Affine,
}

impl BnSigner {
    pub fn new(secret: &[u8]) -> Result<Self> {
        let secret = Fr::from_be_bytes_mod_order(secret);
        if secret.is_zero() {
            return Err(LedgerError::Crypto("bn256 secret key is zero".to_string()));
        }
        let public = (G2Affine::generator() * secret).into_affine();
        Ok(BnSigner { secret, public })
    }
}

impl sealed::Sealed for BnSigner {}

impl Signer for BnSigner {
    fn curve_spec(&self) -> CurveSpec {
        CurveSpec::Bn256Eth
    }

    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let point = (hash_to_g1(msg)? * self.secret).into_affine();
        let mut out = self.pubkey()?;
        point.serialize_uncompressed(&mut out).map_err(ser_err)?;
        Ok(out)
    }

    fn pubkey(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(BN256_SIG_LEN);
        self.public.serialize_uncompressed(&mut out).map_err(ser_err)?;
        Ok(out)
    }
}

/// Verify a BN256Eth signature and return the embedded public key.
///
/// e(σ, g2) must equal e(H(msg), pk).
pub fn verify(msg: &[u8], sig: &[u8]) -> Result<Vec<u8>> {
    if sig.len() != BN256_SIG_LEN {
        return Err(LedgerError::Crypto(format!(
            "bn256 signature must be {} bytes, got {}",
            BN256_SIG_LEN,
            sig.len()
        )));
    }
    let (pk_bytes, sig_bytes) = sig.split_at(BN256_PUBKEY_LEN);
    let pubkey = G2Affine::deserialize_uncompressed(pk_bytes).map_err(ser_err)?;
    let point = G1Affine::deserialize_uncompressed(sig_bytes).map_err(ser_err)?;
    if pubkey.is_zero() || point.is_zero() {
        return Err(LedgerError::Authorization("bn256 identity point".to_string()));
    }
    let hashed = hash_to_g1(msg)?;
    let lhs = Bn254::pairing(point, G2Affine::generator());
    let rhs = Bn254::pairing(hashed, pubkey);
    if lhs != rhs {
        return Err(LedgerError::Authorization("bn256 pairing check failed".to_string()));
    }
    Ok(pk_bytes.to_vec())
}
