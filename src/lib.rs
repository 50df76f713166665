// Proof of Burn reference model
// Off-circuit implementation of the EIP-7503 burn and spend circuits: burn
// address derivation and PoW, MPT account proofs, Poseidon coins and
// public commitments.

pub mod circuits;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod interfaces;
pub mod utils;
pub mod witness;

// Re-export commonly used types
pub use config::{CircuitParams, ProtocolConfig, ProtocolVersion};
pub use error::{Classify, ErrorKind, Verdict};
pub use field::FieldElement;
pub use utils::burn_address::{derive_burn_address, BurnParams};
pub use utils::pow::{find_burn_key, find_burn_key_parallel, PowSolution, SearchOptions};

pub use circuits::{
    check_burn, check_spend, ProofOfBurnCircuit, ProofOfBurnInputs, ProofOfBurnOutputs, SpendCircuit, SpendInputs,
    SpendOutputs,
};
