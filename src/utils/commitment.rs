// Public commitment, nullifier and coin
//
// A circuit exposes a single public value: keccak256 over its public outputs
// packed as 32-byte big-endian words, of which the leading 31 bytes are kept
// so the result is always below the BN254 modulus.

use alloy_primitives::U256;

use crate::constants::{poseidon_coin_prefix, poseidon_nullifier_prefix};
use crate::error::{Classify, ErrorKind};
use crate::field::{FieldElement, FieldError};
use crate::utils::keccak::keccak256;
use crate::utils::poseidon::{poseidon2, poseidon3, HashError};

/// Bytes of the keccak digest kept in a public commitment
pub const COMMITMENT_BYTES: usize = 31;

pub fn public_commitment(values: &[U256]) -> FieldElement {
    let packed: Vec<u8> = values
        .iter()
        .flat_map(|v| v.to_be_bytes::<32>())
        .collect();
    let digest = keccak256(&packed);
    FieldElement::from_be_bytes_mod_order(&digest[..COMMITMENT_BYTES])
}

/// Poseidon2(NULLIFIER_PREFIX, burnKey)
pub fn nullifier(burn_key: FieldElement) -> Result<FieldElement, HashError> {
    poseidon2([poseidon_nullifier_prefix(), burn_key])
}

/// Poseidon3(COIN_PREFIX, burnKey, balance)
pub fn coin(burn_key: FieldElement, balance: U256) -> Result<FieldElement, CommitmentError> {
    let balance = FieldElement::try_from_u256(balance)?;
    Ok(poseidon3([poseidon_coin_prefix(), burn_key, balance])?)
}

#[derive(Debug, thiserror::Error)]
pub enum CommitmentError {
    #[error("coin balance: {0}")]
    Field(#[from] FieldError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

impl Classify for CommitmentError {
    fn kind(&self) -> ErrorKind {
        match self {
            CommitmentError::Field(e) => e.kind(),
            CommitmentError::Hash(e) => e.kind(),
        }
    }
}
