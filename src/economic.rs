//! DataStore deposit economics
//!
//! A DataStore pays rent in epochs. Storing `dataSize` bytes costs
//! `dataSize + BASE_DATASIZE_CONST` per epoch, plus two epochs of
//! collateral that is never consumed.

use crate::constants::*;
use crate::error::{LedgerError, Result};
use crate::uint256::Uint256;

/// Cost of keeping `data_size` bytes for one epoch
fn epoch_cost(data_size: u32) -> Result<Uint256> {
    if data_size > MAX_DATASTORE_SIZE {
        return Err(LedgerError::Economic(format!(
            "data size {} exceeds maximum {}",
            data_size, MAX_DATASTORE_SIZE
        )));
    }
    Uint256::from(data_size).try_add(&Uint256::base_datasize_const())
}

/// BaseDepositEquation: ℕ × ℕ → ℕ
///
/// deposit = (dataSize + BASE_DATASIZE_CONST) * (2 + numEpochs)
pub fn base_deposit_equation(data_size: u32, num_epochs: u32) -> Result<Uint256> {
    let cost = epoch_cost(data_size)?;
    let epochs = Uint256::from(num_epochs).try_add(&Uint256::two())?;
    cost.try_mul(&epochs)
}

/// NumEpochsEquation: ℕ × ℕ → ℕ
///
/// Inverse of the base deposit equation:
/// numEpochs = ⌊deposit / (dataSize + BASE_DATASIZE_CONST)⌋ - 2
pub fn num_epochs_equation(data_size: u32, deposit: &Uint256) -> Result<u32> {
    let cost = epoch_cost(data_size)?;
    let quotient = deposit.try_div(&cost)?;
    if quotient < Uint256::two() {
        return Err(LedgerError::Economic(
            "deposit does not cover the two collateral epochs".to_string(),
        ));
    }
    quotient.try_sub(&Uint256::two())?.to_u32()
}

/// RewardDepositEquation: ℕ × ℕ × ℕ × ℕ → ℕ
///
/// Value of a DataStore deposit consumed at `epoch_final` when it was
/// issued at `epoch_initial`:
///
/// 1. The full deposit when nothing has elapsed
/// 2. Decreasing by one epoch cost for each elapsed epoch
/// 3. Exactly one epoch cost once the paid epochs are exhausted
pub fn reward_deposit_equation(
    deposit: &Uint256,
    data_size: u32,
    epoch_initial: u32,
    epoch_final: u32,
) -> Result<Uint256> {
    if epoch_final < epoch_initial {
        return Err(LedgerError::Economic(format!(
            "final epoch {} precedes initial epoch {}",
            epoch_final, epoch_initial
        )));
    }
    let num_epochs = num_epochs_equation(data_size, deposit)?;
    let cost = epoch_cost(data_size)?;
    let elapsed = epoch_final - epoch_initial;
    if elapsed > num_epochs {
        return Ok(cost);
    }
    let used = base_deposit_equation(data_size, elapsed)?;
    let collateral = cost.try_mul(&Uint256::two())?;
    deposit.try_add(&collateral)?.try_sub(&used)
}

/// Fee for storing a DataStore: perEpochFee * (numEpochs + 2)
pub fn data_store_fee_equation(per_epoch_fee: &Uint256, num_epochs: u32) -> Result<Uint256> {
    let epochs = Uint256::from(num_epochs).try_add(&Uint256::two())?;
    per_epoch_fee.try_mul(&epochs)
}
