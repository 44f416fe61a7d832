//! Fee schedule lookup.
//!
//! Validation reads protocol fees through `StorageGetter` so the engine
//! stays independent of where the parameters are persisted.

use crate::error::{LedgerError, Result};
use crate::uint256::Uint256;
use serde::{Deserialize, Serialize};

/// Read access to the protocol fee parameters
pub trait StorageGetter {
    /// Fee charged for creating a ValueStore
    fn get_value_store_fee(&self) -> Result<Uint256>;

    /// Fee charged for creating an AtomicSwap
    fn get_atomic_swap_fee(&self) -> Result<Uint256>;

    /// Fee charged per stored epoch of a DataStore
    fn get_data_store_epoch_fee(&self) -> Result<Uint256>;

    /// Minimum fee a transaction must pay
    fn get_min_tx_fee(&self) -> Result<Uint256>;
}

/// Static fee parameters, loadable from JSON configuration.
///
/// ```
/// use ledger_objs::storage::{FeeSchedule, StorageGetter};
///
/// let fees = FeeSchedule::from_json(r#"{
///     "value_store_fee": 0,
///     "atomic_swap_fee": 0,
///     "data_store_epoch_fee": 0,
///     "min_tx_fee": 4
/// }"#).unwrap();
/// assert_eq!(fees.get_min_tx_fee().unwrap().to_u32().unwrap(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub value_store_fee: Uint256,
    pub atomic_swap_fee: Uint256,
    pub data_store_epoch_fee: Uint256,
    pub min_tx_fee: Uint256,
}

impl FeeSchedule {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LedgerError::InvalidEncoding(format!("fee schedule: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::InvalidEncoding(format!("fee schedule: {}", e)))
    }
}

impl StorageGetter for FeeSchedule {
    fn get_value_store_fee(&self) -> Result<Uint256> {
        Ok(self.value_store_fee)
    }

    fn get_atomic_swap_fee(&self) -> Result<Uint256> {
        Ok(self.atomic_swap_fee)
    }

    fn get_data_store_epoch_fee(&self) -> Result<Uint256> {
        Ok(self.data_store_epoch_fee)
    }

    fn get_min_tx_fee(&self) -> Result<Uint256> {
        Ok(self.min_tx_fee)
    }
}
