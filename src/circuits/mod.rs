// Circuit models

pub mod proof_of_burn;
pub mod spend;

// Re-export main types
pub use proof_of_burn::{check_burn, ProofOfBurnCircuit, ProofOfBurnError, ProofOfBurnInputs, ProofOfBurnOutputs};
pub use spend::{check_spend, SpendCircuit, SpendError, SpendInputs, SpendOutputs};
