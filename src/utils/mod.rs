// Utility modules for Proof of Burn circuits

pub mod burn_address;
pub mod commitment;
pub mod header;
pub mod keccak;
pub mod mpt;
pub mod nibbles;
pub mod padded;
pub mod poseidon;
pub mod pow;
pub mod rlp;
pub mod serde_decimal;
pub mod trie;
