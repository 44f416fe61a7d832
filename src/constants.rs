//! Ledger protocol constants

/// Length of a Keccak-256 digest and of every hash-typed field
pub const HASH_LEN: usize = 32;

/// Length of an account address (last 20 bytes of Keccak-256(pubkey))
pub const OWNER_LEN: usize = 20;

/// Number of blocks in one epoch
pub const EPOCH_LENGTH: u32 = 1024;

/// Per-record byte overhead charged on top of raw data for DataStore deposits
pub const BASE_DATASIZE_CONST: u32 = 376;

/// Maximum raw data payload of a DataStore: 2 MiB
pub const MAX_DATASTORE_SIZE: u32 = 2_097_152;

/// Maximum number of inputs or outputs in a transaction
pub const MAX_TX_VECTOR_LENGTH: usize = 128;

/// Maximum encoded transaction size: must fit one full DataStore
pub const MAX_TX_SIZE: usize = 3_000_000;

/// Sentinel output index marking a deposit-origin ValueStore
pub const DEPOSIT_TX_OUT_IDX: u32 = u32::MAX;

/// Length of a recoverable secp256k1 signature: r ‖ s ‖ v
pub const SECP256K1_SIG_LEN: usize = 65;

/// Length of an uncompressed BN256 G2 public key
pub const BN256_PUBKEY_LEN: usize = 128;

/// Length of an uncompressed BN256 G1 signature point
pub const BN256_G1_LEN: usize = 64;

/// Length of a BN256Eth signature: G2 public key ‖ G1 signature
pub const BN256_SIG_LEN: usize = BN256_PUBKEY_LEN + BN256_G1_LEN;
