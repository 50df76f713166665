// Poseidon hash over the BN254 scalar field
// circom-compatible parameters from light-poseidon, so digests match the
// circuits' Poseidon(n) templates.

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher};

use crate::error::{Classify, ErrorKind};
use crate::field::FieldElement;

/// Largest arity supported by the circom parameter set
pub const MAX_INPUTS: usize = 12;

/// Poseidon hash of 1 to 12 field elements
pub fn poseidon_hash(inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
    if inputs.is_empty() || inputs.len() > MAX_INPUTS {
        return Err(HashError::Arity { arity: inputs.len() });
    }
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())?;
    let elements: Vec<Fr> = inputs.iter().map(FieldElement::inner).collect();
    Ok(FieldElement::from(hasher.hash(&elements)?))
}

pub fn poseidon2(inputs: [FieldElement; 2]) -> Result<FieldElement, HashError> {
    poseidon_hash(&inputs)
}

pub fn poseidon3(inputs: [FieldElement; 3]) -> Result<FieldElement, HashError> {
    poseidon_hash(&inputs)
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Poseidon arity {arity} is not supported")]
    Arity { arity: usize },

    #[error("Poseidon failure: {0}")]
    Poseidon(#[from] PoseidonError),
}

impl Classify for HashError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::RangeViolation
    }
}
