//! Transaction outputs: the closed set of on-chain asset kinds.

use crate::atomicswap::AtomicSwap;
use crate::codec::{Canonical, Reader};
use crate::datastore::DataStore;
use crate::error::{LedgerError, Result};
use crate::owner::Owner;
use crate::storage::StorageGetter;
use crate::txfee::TxFee;
use crate::txin::TxIn;
use crate::types::{Account, Hash};
use crate::uint256::Uint256;
use crate::valuestore::ValueStore;

/// Encoding tag of each output kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum TxOutTag {
    DataStore = 1,
    ValueStore = 2,
    AtomicSwap = 3,
    TxFee = 4,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOut {
    DataStore(DataStore),
    ValueStore(ValueStore),
    AtomicSwap(AtomicSwap),
    TxFee(TxFee),
}

impl From<DataStore> for TxOut {
    fn from(ds: DataStore) -> Self {
        TxOut::DataStore(ds)
    }
}

impl From<ValueStore> for TxOut {
    fn from(vs: ValueStore) -> Self {
        TxOut::ValueStore(vs)
    }
}

impl From<AtomicSwap> for TxOut {
    fn from(swap: AtomicSwap) -> Self {
        TxOut::AtomicSwap(swap)
    }
}

impl From<TxFee> for TxOut {
    fn from(tf: TxFee) -> Self {
        TxOut::TxFee(tf)
    }
}

fn not_spendable() -> LedgerError {
    LedgerError::InvalidObject("txfee outputs cannot be consumed".to_string())
}

macro_rules! dispatch {
    ($self:expr, $out:ident => $body:expr) => {
        match $self {
            TxOut::DataStore($out) => $body,
            TxOut::ValueStore($out) => $body,
            TxOut::AtomicSwap($out) => $body,
            TxOut::TxFee($out) => $body,
        }
    };
}

impl TxOut {
    fn tag(&self) -> TxOutTag {
        match self {
            TxOut::DataStore(_) => TxOutTag::DataStore,
            TxOut::ValueStore(_) => TxOutTag::ValueStore,
            TxOut::AtomicSwap(_) => TxOutTag::AtomicSwap,
            TxOut::TxFee(_) => TxOutTag::TxFee,
        }
    }

    pub fn has_data_store(&self) -> bool {
        matches!(self, TxOut::DataStore(_))
    }

    pub fn has_value_store(&self) -> bool {
        matches!(self, TxOut::ValueStore(_))
    }

    pub fn has_atomic_swap(&self) -> bool {
        matches!(self, TxOut::AtomicSwap(_))
    }

    pub fn has_tx_fee(&self) -> bool {
        matches!(self, TxOut::TxFee(_))
    }

    pub fn data_store(&self) -> Result<&DataStore> {
        match self {
            TxOut::DataStore(ds) => Ok(ds),
            _ => Err(wrong_kind("DataStore", self)),
        }
    }

    pub fn data_store_mut(&mut self) -> Result<&mut DataStore> {
        match self {
            TxOut::DataStore(ds) => Ok(ds),
            other => Err(wrong_kind("DataStore", other)),
        }
    }

    pub fn value_store(&self) -> Result<&ValueStore> {
        match self {
            TxOut::ValueStore(vs) => Ok(vs),
            _ => Err(wrong_kind("ValueStore", self)),
        }
    }

    pub fn atomic_swap(&self) -> Result<&AtomicSwap> {
        match self {
            TxOut::AtomicSwap(swap) => Ok(swap),
            _ => Err(wrong_kind("AtomicSwap", self)),
        }
    }

    pub fn tx_fee(&self) -> Result<&TxFee> {
        match self {
            TxOut::TxFee(tf) => Ok(tf),
            _ => Err(wrong_kind("TxFee", self)),
        }
    }

    pub fn chain_id(&self) -> u32 {
        dispatch!(self, out => out.chain_id())
    }

    pub fn pre_hash(&self) -> Result<Hash> {
        dispatch!(self, out => out.pre_hash())
    }

    pub fn utxo_id(&self) -> Result<Hash> {
        dispatch!(self, out => out.utxo_id())
    }

    pub fn tx_out_idx(&self) -> u32 {
        dispatch!(self, out => out.tx_out_idx())
    }

    pub fn set_tx_out_idx(&mut self, idx: u32) {
        dispatch!(self, out => out.set_tx_out_idx(idx))
    }

    pub fn tx_hash(&self) -> Hash {
        dispatch!(self, out => out.tx_hash())
    }

    pub fn set_tx_hash(&mut self, tx_hash: Hash) {
        dispatch!(self, out => out.set_tx_hash(tx_hash))
    }

    pub fn fee(&self) -> Uint256 {
        dispatch!(self, out => out.fee())
    }

    /// Value carried by the output, excluding its fee
    pub fn value(&self) -> Uint256 {
        match self {
            TxOut::DataStore(ds) => ds.deposit(),
            TxOut::ValueStore(vs) => vs.value(),
            TxOut::AtomicSwap(swap) => swap.value(),
            TxOut::TxFee(_) => Uint256::zero(),
        }
    }

    /// Amount the creating transaction must fund
    pub fn value_plus_fee(&self) -> Result<Uint256> {
        match self {
            TxOut::DataStore(ds) => ds.value_plus_fee(),
            TxOut::ValueStore(vs) => vs.value_plus_fee(),
            TxOut::AtomicSwap(swap) => swap.value_plus_fee(),
            TxOut::TxFee(tf) => Ok(tf.fee()),
        }
    }

    pub fn validate_fee<S: StorageGetter + ?Sized>(&self, storage: &S) -> Result<()> {
        dispatch!(self, out => out.validate_fee(storage))
    }

    pub fn is_deposit(&self) -> bool {
        match self {
            TxOut::ValueStore(vs) => vs.is_deposit(),
            _ => false,
        }
    }

    pub fn is_expired(&self, height: u32) -> Result<bool> {
        match self {
            TxOut::DataStore(ds) => ds.is_expired(height),
            TxOut::AtomicSwap(swap) => Ok(swap.is_expired(height)),
            TxOut::ValueStore(_) | TxOut::TxFee(_) => Ok(false),
        }
    }

    /// Value credited to whoever consumes the output at `height`
    pub fn remaining_value(&self, height: u32) -> Result<Uint256> {
        match self {
            TxOut::DataStore(ds) => ds.remaining_value(height),
            TxOut::ValueStore(vs) => Ok(vs.value()),
            TxOut::AtomicSwap(swap) => Ok(swap.value()),
            TxOut::TxFee(_) => Err(not_spendable()),
        }
    }

    pub fn make_tx_in(&self) -> Result<TxIn> {
        match self {
            TxOut::DataStore(ds) => Ok(ds.make_tx_in()),
            TxOut::ValueStore(vs) => Ok(vs.make_tx_in()),
            TxOut::AtomicSwap(swap) => Ok(swap.make_tx_in()),
            TxOut::TxFee(_) => Err(not_spendable()),
        }
    }

    /// Only DataStores carry a creation signature
    pub fn validate_pre_signature(&self) -> Result<()> {
        match self {
            TxOut::DataStore(ds) => ds.validate_pre_signature(),
            _ => Ok(()),
        }
    }

    /// Check `txin`'s signature against this output's owner
    pub fn validate_signature(&self, height: u32, txin: &TxIn) -> Result<()> {
        match self {
            TxOut::DataStore(ds) => ds.validate_signature(height, txin),
            TxOut::ValueStore(vs) => vs.validate_signature(txin),
            TxOut::AtomicSwap(swap) => swap.validate_signature(height, txin),
            TxOut::TxFee(_) => Err(not_spendable()),
        }
    }

    pub fn must_be_mined_before_height(&self) -> Result<u32> {
        match self {
            TxOut::DataStore(ds) => ds.must_be_mined_before_height(),
            TxOut::AtomicSwap(swap) => swap.must_be_mined_before_height(),
            TxOut::ValueStore(_) | TxOut::TxFee(_) => Ok(u32::MAX),
        }
    }

    pub fn cannot_be_mined_before_height(&self) -> Result<u32> {
        match self {
            TxOut::DataStore(ds) => ds.cannot_be_mined_before_height(),
            TxOut::AtomicSwap(swap) => swap.cannot_be_mined_before_height(),
            TxOut::ValueStore(_) | TxOut::TxFee(_) => Ok(1),
        }
    }

    pub fn generic_owner(&self) -> Result<Owner> {
        match self {
            TxOut::DataStore(ds) => Ok(ds.owner().generic_owner()),
            TxOut::ValueStore(vs) => Ok(vs.owner().generic_owner()),
            TxOut::AtomicSwap(swap) => Ok(swap.owner().generic_owner()),
            TxOut::TxFee(_) => Err(LedgerError::InvalidObject("txfee has no owner".to_string())),
        }
    }

    pub fn account(&self) -> Result<Account> {
        Ok(self.generic_owner()?.account)
    }
}

fn wrong_kind(expected: &str, out: &TxOut) -> LedgerError {
    LedgerError::InvalidObject(format!("expected {} output, found {:?}", expected, out.tag()))
}

impl Canonical for TxOut {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.push(self.tag() as u8);
        dispatch!(self, out => out.encode(buf))
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let out = match reader.read_u8()? {
            1 => TxOut::DataStore(DataStore::decode(reader)?),
            2 => TxOut::ValueStore(ValueStore::decode(reader)?),
            3 => TxOut::AtomicSwap(AtomicSwap::decode(reader)?),
            4 => TxOut::TxFee(TxFee::decode(reader)?),
            other => {
                return Err(LedgerError::InvalidEncoding(format!(
                    "unknown txout tag {}",
                    other
                )))
            }
        };
        Ok(out)
    }
}
