//! In-memory sparse Merkle trie root.
//!
//! Only the root is needed: a transaction commits to its inputs and
//! outputs as a 256-level binary trie keyed by UTXO identifier. A subtree
//! holding a single key collapses to a leaf at that height, and an empty
//! subtree hashes as the one-byte default leaf.

use crate::crypto::keccak256;
use crate::error::{LedgerError, Result};
use crate::types::Hash;
use tracing::trace;

/// Placeholder hashed in for an empty subtree
pub const DEFAULT_LEAF: [u8; 1] = [0];

const KEY_BITS: usize = 256;

fn bit_is_set(key: &Hash, i: usize) -> bool {
    key[i / 8] & (1 << (7 - i % 8)) != 0
}

/// Leaf: Keccak256(key ‖ value ‖ height)
fn leaf_hash(key: &Hash, value: &Hash, height: usize) -> Hash {
    keccak256(&[&key[..], &value[..], &[height as u8][..]])
}

fn node_hash(left: Option<Hash>, right: Option<Hash>) -> Hash {
    let l = left.as_ref().map_or(&DEFAULT_LEAF[..], |h| &h[..]);
    let r = right.as_ref().map_or(&DEFAULT_LEAF[..], |h| &h[..]);
    keccak256(&[l, r])
}

/// Root of the subtree at `height` over sorted, distinct leaves
fn subtree_root(leaves: &[(Hash, Hash)], height: usize) -> Option<Hash> {
    match leaves {
        [] => None,
        [(key, value)] => Some(leaf_hash(key, value, height)),
        _ => {
            let bit = KEY_BITS - height;
            let split = leaves.partition_point(|(key, _)| !bit_is_set(key, bit));
            let left = subtree_root(&leaves[..split], height - 1);
            let right = subtree_root(&leaves[split..], height - 1);
            Some(node_hash(left, right))
        }
    }
}

/// Compute the root over (key, value) pairs.
///
/// Pairs are sorted by key first; a repeated key is a structural conflict.
/// The empty trie has root Keccak256("").
pub fn compute_root(mut leaves: Vec<(Hash, Hash)>) -> Result<Hash> {
    if leaves.is_empty() {
        return Ok(keccak256(&[]));
    }
    leaves.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    if let Some(dup) = leaves.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(LedgerError::Conflict(format!(
            "duplicate trie key {}",
            hex::encode(dup[0].0)
        )));
    }
    let root = subtree_root(&leaves, KEY_BITS).unwrap_or_else(|| keccak256(&[]));
    trace!(leaves = leaves.len(), root = %hex::encode(root), "computed trie root");
    Ok(root)
}
