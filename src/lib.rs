//! # Ledger Objects
//!
//! UTXO object model and transaction validation for a permissioned
//! account-owned ledger.
//!
//! The crate defines the on-chain asset types (ValueStore, DataStore,
//! AtomicSwap, TxFee), their owners and signature records, the canonical
//! binary encoding every node must agree on, and the rules deciding whether a
//! transaction may enter the pending pool or a block.
//!
//! ## Architecture
//!
//! Modules are layered, leaves first:
//! - `uint256`, `crypto`, `bn256` (arithmetic and signatures)
//! - `owner`, `asowner` (who may spend)
//! - `valuestore`, `datastore`, `atomicswap`, `txfee` (assets and economics)
//! - `txin`, `txout` (transaction vectors)
//! - `smt`, `transaction`, `txvec` (commitment and validation)
//!
//! ## Design Principles
//!
//! 1. **Deterministic encoding**: every object has exactly one canonical byte form
//! 2. **No silent overflow**: all value arithmetic fails explicitly
//! 3. **Exact Version Pinning**: consensus-critical crypto crates are pinned
//! 4. **Pure validation**: fee parameters arrive through `StorageGetter`
//!
//! ## Usage
//!
//! ```rust
//! use ledger_objs::*;
//!
//! let key = Secp256k1Signer::new(&[7u8; 32])?;
//! let owner = Owner::new(key.account()?, CurveSpec::Secp256k1);
//! let deposit: TxOut =
//!     ValueStore::new_from_deposit(2, Uint256::from(100u32), &owner, [1u8; 32])?.into();
//!
//! let out = ValueStore::new(
//!     2,
//!     Uint256::from(90u32),
//!     Uint256::zero(),
//!     ValueStoreOwner::new_from_owner(&owner),
//!     [0u8; 32],
//! )?;
//! let mut tx = Tx::new(vec![deposit.make_tx_in()?], vec![out.into()], Uint256::from(10u32));
//! tx.set_tx_hash()?;
//! deposit.value_store()?.sign(&mut tx.vin_mut()[0], &key)?;
//!
//! let fees = FeeSchedule {
//!     min_tx_fee: Uint256::from(10u32),
//!     ..FeeSchedule::default()
//! };
//! let validator = LedgerValidator::new(2)?;
//! validator.pre_validate_pending(&tx)?;
//! validator.post_validate_pending(&tx, 1, &[deposit], &fees)?;
//! # Ok::<(), LedgerError>(())
//! ```

pub mod error;
pub mod constants;
pub mod types;
pub mod codec;
pub mod uint256;
pub mod crypto;
pub mod bn256;
pub mod owner;
pub mod asowner;
pub mod economic;
pub mod storage;
pub mod txin;
pub mod valuestore;
pub mod datastore;
pub mod atomicswap;
pub mod txfee;
pub mod txout;
pub mod smt;
pub mod transaction;
pub mod txvec;

// Re-export commonly used types
pub use asowner::{AtomicSwapOwner, AtomicSwapSignature, AtomicSwapSubOwner};
pub use atomicswap::AtomicSwap;
pub use bn256::BnSigner;
pub use codec::Canonical;
pub use constants::*;
pub use crypto::{keccak256, Secp256k1Signer, Signer};
pub use datastore::DataStore;
pub use error::{LedgerError, Result};
pub use owner::{DataStoreOwner, DataStoreSignature, Owner, ValueStoreOwner, ValueStoreSignature};
pub use storage::{FeeSchedule, StorageGetter};
pub use transaction::Tx;
pub use txfee::TxFee;
pub use txin::TxIn;
pub use txout::TxOut;
pub use txvec::TxVec;
pub use types::*;
pub use uint256::Uint256;
pub use valuestore::ValueStore;

/// Validation entry point bound to one chain
///
/// # Examples
///
/// ```
/// use ledger_objs::LedgerValidator;
///
/// let validator = LedgerValidator::new(2).unwrap();
/// assert_eq!(validator.chain_id(), 2);
/// assert!(LedgerValidator::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerValidator {
    chain_id: u32,
}

impl LedgerValidator {
    pub fn new(chain_id: u32) -> Result<Self> {
        if chain_id == 0 {
            return Err(LedgerError::InvalidObject("chain id is zero".to_string()));
        }
        Ok(Self { chain_id })
    }

    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    /// Stateless admission checks for the pending pool
    pub fn pre_validate_pending(&self, tx: &Tx) -> Result<()> {
        tx.pre_validate_pending(self.chain_id)
    }

    /// Admission checks against the referenced UTXOs and fee schedule
    pub fn post_validate_pending<S: StorageGetter + ?Sized>(
        &self,
        tx: &Tx,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        tx.post_validate_pending(height, consumed, storage)
    }

    /// Validate every transaction of a proposed block at `height`.
    ///
    /// A structural error (see [`LedgerError::is_structural`]) means the
    /// block itself is malformed.
    pub fn validate_block_txs<S: StorageGetter + ?Sized>(
        &self,
        txs: &TxVec,
        height: u32,
        consumed: &[TxOut],
        storage: &S,
    ) -> Result<()> {
        txs.pre_validate_apply_state(self.chain_id)?;
        txs.validate(height, consumed, storage)
    }

    /// Whether `tx` may be mined at `height`
    pub fn validate_for_mining(&self, tx: &Tx, height: u32) -> Result<()> {
        if height < tx.cannot_be_mined_until()? {
            return Err(LedgerError::InvalidObject(format!(
                "transaction cannot be mined before height {}",
                tx.cannot_be_mined_until()?
            )));
        }
        tx.validate_issued_at_for_mining(height)
    }
}
