// Keccak256 over the sha3 crate, used for trie nodes, headers, PoW tags
// and public commitments.

use sha3::{Digest, Keccak256};

/// Compute Keccak256 hash of input bytes
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Keccak256 over several slices without concatenating them first
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
