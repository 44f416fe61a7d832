//! Owners and signatures for ValueStore and DataStore outputs.
//!
//! Each owner kind carries an SVA tag in its encoding so a signature made
//! for one asset kind cannot authorise spending another.

use crate::codec::{Canonical, Reader};
use crate::crypto::{recover_account, Signer};
use crate::error::{LedgerError, Result};
use crate::types::{Account, CurveSpec, Sva};
use serde::{Deserialize, Serialize};

/// Generic owner: curve spec + account, independent of asset kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub curve_spec: CurveSpec,
    pub account: Account,
}

impl Owner {
    pub fn new(account: Account, curve_spec: CurveSpec) -> Self {
        Owner { curve_spec, account }
    }
}

impl Canonical for Owner {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.push(self.curve_spec as u8);
        buf.extend_from_slice(&self.account);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let curve_spec = CurveSpec::try_from(reader.read_u8()?)?;
        let account = reader.read_array()?;
        Ok(Owner { curve_spec, account })
    }
}

fn expect_sva(reader: &mut Reader<'_>, expected: Sva) -> Result<()> {
    let sva = Sva::try_from(reader.read_u8()?)?;
    if sva != expected {
        return Err(LedgerError::InvalidEncoding(format!(
            "SVA mismatch: expected {:?} got {:?}",
            expected, sva
        )));
    }
    Ok(())
}

/// Read a curve byte followed by a signature of that curve's exact length
fn decode_curve_signature(reader: &mut Reader<'_>) -> Result<(CurveSpec, Vec<u8>)> {
    let curve_spec = CurveSpec::try_from(reader.read_u8()?)?;
    let signature = reader.read_bytes(curve_spec.signature_len())?.to_vec();
    Ok((curve_spec, signature))
}

fn check_signature_len(curve_spec: CurveSpec, signature: &[u8]) -> Result<()> {
    if signature.len() != curve_spec.signature_len() {
        return Err(LedgerError::InvalidEncoding(format!(
            "{:?} signature must be {} bytes, got {}",
            curve_spec,
            curve_spec.signature_len(),
            signature.len()
        )));
    }
    Ok(())
}

macro_rules! signature_record {
    ($name:ident, $sva:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub curve_spec: CurveSpec,
            pub signature: Vec<u8>,
        }

        impl $name {
            pub fn new(curve_spec: CurveSpec, signature: Vec<u8>) -> Result<Self> {
                check_signature_len(curve_spec, &signature)?;
                Ok($name { curve_spec, signature })
            }
        }

        impl Canonical for $name {
            fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
                check_signature_len(self.curve_spec, &self.signature)?;
                buf.push($sva as u8);
                buf.push(self.curve_spec as u8);
                buf.extend_from_slice(&self.signature);
                Ok(())
            }

            fn decode(reader: &mut Reader<'_>) -> Result<Self> {
                expect_sva(reader, $sva)?;
                let (curve_spec, signature) = decode_curve_signature(reader)?;
                Ok($name { curve_spec, signature })
            }
        }
    };
}

signature_record!(ValueStoreSignature, Sva::ValueStore);
signature_record!(DataStoreSignature, Sva::DataStore);

fn encode_tagged_owner(buf: &mut Vec<u8>, sva: Sva, owner: &Owner) -> Result<()> {
    buf.push(sva as u8);
    owner.encode(buf)
}

// ============================================================================
// VALUESTORE OWNER
// ============================================================================

/// Owner of a ValueStore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueStoreOwner {
    pub curve_spec: CurveSpec,
    pub account: Account,
}

impl ValueStoreOwner {
    pub fn new(account: Account, curve_spec: CurveSpec) -> Self {
        ValueStoreOwner { curve_spec, account }
    }

    pub fn new_from_owner(owner: &Owner) -> Self {
        ValueStoreOwner::new(owner.account, owner.curve_spec)
    }

    pub fn generic_owner(&self) -> Owner {
        Owner::new(self.account, self.curve_spec)
    }

    pub fn sign<S: Signer + ?Sized>(&self, msg: &[u8], signer: &S) -> Result<ValueStoreSignature> {
        ValueStoreSignature::new(signer.curve_spec(), signer.sign(msg)?)
    }

    /// Curve must match and the recovered account must equal the owner's
    pub fn validate_signature(&self, msg: &[u8], sig: &ValueStoreSignature) -> Result<()> {
        if sig.curve_spec != self.curve_spec {
            return Err(LedgerError::Authorization(
                "valuestore signature curve mismatch".to_string(),
            ));
        }
        let account = recover_account(sig.curve_spec, msg, &sig.signature)?;
        if account != self.account {
            return Err(LedgerError::Authorization(
                "valuestore signature from wrong account".to_string(),
            ));
        }
        Ok(())
    }
}

impl Canonical for ValueStoreOwner {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        encode_tagged_owner(buf, Sva::ValueStore, &self.generic_owner())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        expect_sva(reader, Sva::ValueStore)?;
        Ok(ValueStoreOwner::new_from_owner(&Owner::decode(reader)?))
    }
}

// ============================================================================
// DATASTORE OWNER
// ============================================================================

/// Owner of a DataStore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataStoreOwner {
    pub curve_spec: CurveSpec,
    pub account: Account,
}

impl DataStoreOwner {
    pub fn new(account: Account, curve_spec: CurveSpec) -> Self {
        DataStoreOwner { curve_spec, account }
    }

    pub fn new_from_owner(owner: &Owner) -> Self {
        DataStoreOwner::new(owner.account, owner.curve_spec)
    }

    pub fn generic_owner(&self) -> Owner {
        Owner::new(self.account, self.curve_spec)
    }

    pub fn sign<S: Signer + ?Sized>(&self, msg: &[u8], signer: &S) -> Result<DataStoreSignature> {
        DataStoreSignature::new(signer.curve_spec(), signer.sign(msg)?)
    }

    /// Validate a consumption or creation signature.
    ///
    /// Before expiration the curve and account must match the owner. After
    /// expiration any signature valid on its own curve is accepted, which
    /// lets anyone clean up an expired DataStore.
    pub fn validate_signature(
        &self,
        msg: &[u8],
        sig: &DataStoreSignature,
        is_expired: bool,
    ) -> Result<()> {
        if !is_expired && sig.curve_spec != self.curve_spec {
            return Err(LedgerError::Authorization(
                "datastore signature curve mismatch".to_string(),
            ));
        }
        let account = recover_account(sig.curve_spec, msg, &sig.signature)?;
        if !is_expired && account != self.account {
            return Err(LedgerError::Authorization(
                "datastore signature from wrong account".to_string(),
            ));
        }
        Ok(())
    }
}

impl Canonical for DataStoreOwner {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        encode_tagged_owner(buf, Sva::DataStore, &self.generic_owner())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        expect_sva(reader, Sva::DataStore)?;
        Ok(DataStoreOwner::new_from_owner(&Owner::decode(reader)?))
    }
}
